use tandem_core::{ParticipantId, RoomId};

/// Result of asking a room to admit a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Admitted. `others` were already present.
    Joined {
        participants: usize,
        others: Vec<ParticipantId>,
    },
    AlreadyMember { participants: usize },
    Full,
}

/// Members of one room, in join order.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    members: Vec<ParticipantId>,
    capacity: usize,
}

impl Room {
    pub fn new(id: RoomId, capacity: usize) -> Self {
        Self {
            id,
            members: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn join(&mut self, participant: &ParticipantId) -> JoinOutcome {
        if self.contains(participant) {
            return JoinOutcome::AlreadyMember {
                participants: self.len(),
            };
        }
        if self.len() >= self.capacity {
            return JoinOutcome::Full;
        }

        let others = self.members.clone();
        self.members.push(participant.clone());
        JoinOutcome::Joined {
            participants: self.len(),
            others,
        }
    }

    /// Returns whether the participant was a member.
    pub fn leave(&mut self, participant: &ParticipantId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != participant);
        self.members.len() != before
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.members.contains(participant)
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn others(&self, participant: &ParticipantId) -> Vec<ParticipantId> {
        self.members
            .iter()
            .filter(|m| *m != participant)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
