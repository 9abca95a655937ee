use std::sync::Arc;

use dashmap::DashMap;
use tandem_core::{ParticipantId, RoomId};
use tracing::info;

use crate::room::{JoinOutcome, Room};

/// All live rooms. Rooms are created on first join and dropped when empty.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, Room>>,
    capacity: usize,
}

impl RoomManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            capacity,
        }
    }

    pub fn join(&self, room_id: &RoomId, participant: &ParticipantId) -> JoinOutcome {
        let mut room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            Room::new(room_id.clone(), self.capacity)
        });
        room.join(participant)
    }

    /// Removes `participant` from the room. Returns the remaining members,
    /// or `None` when it was not a member.
    pub fn leave(&self, room_id: &RoomId, participant: &ParticipantId) -> Option<Vec<ParticipantId>> {
        let remaining = {
            let mut room = self.rooms.get_mut(room_id)?;
            if !room.leave(participant) {
                return None;
            }
            room.members().to_vec()
        };

        if self.rooms.remove_if(room_id, |_, room| room.is_empty()).is_some() {
            info!("Room {} is empty, removing", room_id);
        }
        Some(remaining)
    }

    /// Removes `participant` from every room it is in.
    pub fn leave_all(&self, participant: &ParticipantId) -> Vec<(RoomId, Vec<ParticipantId>)> {
        let joined: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|room| room.contains(participant))
            .map(|room| room.key().clone())
            .collect();

        joined
            .into_iter()
            .filter_map(|room_id| {
                let remaining = self.leave(&room_id, participant)?;
                Some((room_id, remaining))
            })
            .collect()
    }

    pub fn is_member(&self, room_id: &RoomId, participant: &ParticipantId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|room| room.contains(participant))
    }

    pub fn others(&self, room_id: &RoomId, participant: &ParticipantId) -> Vec<ParticipantId> {
        self.rooms
            .get(room_id)
            .map(|room| room.others(participant))
            .unwrap_or_default()
    }

    pub fn members(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        self.rooms
            .get(room_id)
            .map(|room| room.members().to_vec())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
