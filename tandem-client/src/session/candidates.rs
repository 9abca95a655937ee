use std::collections::VecDeque;

use tandem_core::IceCandidate;

/// Holds remote candidates until the remote description is set.
#[derive(Debug, Default)]
pub(crate) struct CandidateBuffer {
    pending: VecDeque<IceCandidate>,
    remote_described: bool,
}

impl CandidateBuffer {
    /// Returns the candidate back when it can be applied right away.
    pub fn push(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_described {
            return Some(candidate);
        }
        self.pending.push_back(candidate);
        None
    }

    /// Marks the remote description as set and drains the buffer in arrival order.
    pub fn mark_described(&mut self) -> Vec<IceCandidate> {
        self.remote_described = true;
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.remote_described = false;
    }
}
