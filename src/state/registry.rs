use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use crate::services::room_controller::RoomHandle;

/// Live rooms keyed by the match they serve. At most one room exists per match id.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the room serving `match_id`, skipping rooms whose task already stopped.
    pub fn get(&self, match_id: &str) -> Option<RoomHandle> {
        self.rooms
            .get(match_id)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Return the live room for `match_id`, or register the one produced by `spawn`.
    ///
    /// The boolean is true when `spawn` ran. A stale entry left by a stopped room is replaced.
    pub fn get_or_insert_with<F>(&self, match_id: &str, spawn: F) -> (RoomHandle, bool)
    where
        F: FnOnce() -> RoomHandle,
    {
        match self.rooms.entry(match_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    let handle = spawn();
                    entry.insert(handle.clone());
                    (handle, true)
                } else {
                    (entry.get().clone(), false)
                }
            }
            Entry::Vacant(entry) => {
                let handle = spawn();
                entry.insert(handle.clone());
                (handle, true)
            }
        }
    }

    /// Remove `match_id` only if it still maps to `room_id`.
    pub fn remove_room(&self, match_id: &str, room_id: Uuid) -> bool {
        self.rooms
            .remove_if(match_id, |_, handle| handle.room_id() == room_id)
            .is_some()
    }

    /// Handles of every live room.
    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
