mod actor;
mod candidates;
mod coordinator;
mod session_command;

pub use coordinator::*;

use tandem_core::ParticipantId;

use crate::error::SessionError;
use crate::transport::RemoteStream;

/// Lifecycle of one room membership's peer session.
///
/// `Offering` covers local media acquisition and offer creation on the
/// initiator; once the offer is sent it waits in `AwaitingAnswer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Joining,
    Offering,
    AwaitingAnswer,
    AnsweringOffer,
    Connected,
    Reconnecting,
    Closed,
}

impl SessionState {
    pub fn is_negotiating(self) -> bool {
        matches!(
            self,
            SessionState::Offering | SessionState::AwaitingAnswer | SessionState::AnsweringOffer
        )
    }

    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

/// Notifications that do not fit the state machine.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The set of received remote tracks changed.
    RemoteStream(RemoteStream),
    PeerLeft(ParticipantId),
    /// A failure with no caller to return it to.
    Error(SessionError),
}
