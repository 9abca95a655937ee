pub use tandem_core::model::{ParticipantId, RoomId};

pub mod model {
    pub use tandem_core::model::*;
    pub use tandem_core::utils::default_ice_servers;
}

#[cfg(feature = "client")]
pub mod client {
    pub use tandem_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use tandem_relay::*;
}
