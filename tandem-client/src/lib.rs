mod config;
mod cursor;
mod error;
mod media;
mod membership;
mod session;
mod signaling;
mod transport;

pub use config::*;
pub use cursor::*;
pub use error::*;
pub use media::*;
pub use membership::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;

pub use tandem_core::{IceCandidate, IceServerConfig, ParticipantId, RoomId, SignalMessage};
