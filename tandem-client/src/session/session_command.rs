use tokio::sync::oneshot;

use crate::error::SessionError;

/// Requests from the [`crate::SessionCoordinator`] handle to its actor.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Re-run the step that failed for a device reason.
    Retry {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Tear everything down and stop.
    Leave { reply: Option<oneshot::Sender<()>> },
}
