use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dto::{
        room::RoomSummary,
        sse::{RoomDisposedEvent, RoomListedEvent, ServerEvent},
    },
    state::SharedState,
};

/// A room was registered for a match.
pub const EVENT_ROOM_CREATED: &str = "room.created";
/// Occupancy or phase of a room changed.
pub const EVENT_ROOM_UPDATED: &str = "room.updated";
/// A room was torn down.
pub const EVENT_ROOM_DISPOSED: &str = "room.disposed";
/// Replay of a live room, sent only to a freshly connected subscriber.
pub const EVENT_ROOM_LISTED: &str = "room.listed";

/// Broadcast that a room was registered for a match.
pub fn broadcast_room_created(state: &SharedState, room: RoomSummary) {
    send_lobby_event(state, EVENT_ROOM_CREATED, &RoomListedEvent { room });
}

/// Broadcast a change in occupancy or phase of a room.
pub fn broadcast_room_updated(state: &SharedState, room: RoomSummary) {
    send_lobby_event(state, EVENT_ROOM_UPDATED, &RoomListedEvent { room });
}

/// Broadcast that a room left the registry.
pub fn broadcast_room_disposed(state: &SharedState, match_id: &str) {
    let payload = RoomDisposedEvent {
        match_id: match_id.to_string(),
    };
    send_lobby_event(state, EVENT_ROOM_DISPOSED, &payload);
}

/// Encode the catch-up entry for one live room.
pub fn room_listed_event(room: RoomSummary) -> Option<ServerEvent> {
    encode(EVENT_ROOM_LISTED, &RoomListedEvent { room })
}

fn encode(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    ServerEvent::json(Some(event.to_string()), payload)
        .inspect_err(|err| warn!(event, error = %err, "failed to serialize lobby SSE payload"))
        .ok()
}

fn send_lobby_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    if let Some(event_payload) = encode(event, payload) {
        let receivers = state.lobby().broadcast(event_payload);
        debug!(event, receivers, "lobby event sent");
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{config::AppConfig, dto::room::VisibleRoomPhase, state::AppState};

    #[test]
    fn events_reach_subscribers_with_names() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.lobby().subscribe();

        broadcast_room_created(
            &state,
            RoomSummary {
                match_id: "m-1".into(),
                room_id: Uuid::nil(),
                clients: 0,
                phase: VisibleRoomPhase::WaitingForPlayers,
                locked: false,
                is_bot: false,
            },
        );
        broadcast_room_disposed(&state, "m-1");

        let created = receiver.try_recv().unwrap();
        assert_eq!(created.event.as_deref(), Some(EVENT_ROOM_CREATED));
        assert!(created.data.contains(r#""matchId":"m-1""#));
        assert!(created.data.contains(r#""phase":"waiting_for_players""#));

        let disposed = receiver.try_recv().unwrap();
        assert_eq!(disposed.event.as_deref(), Some(EVENT_ROOM_DISPOSED));
        assert_eq!(disposed.data, r#"{"matchId":"m-1"}"#);
    }

    #[test]
    fn catch_up_entries_are_not_broadcast() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.lobby().subscribe();

        let listed = room_listed_event(RoomSummary {
            match_id: "m-2".into(),
            room_id: Uuid::nil(),
            clients: 1,
            phase: VisibleRoomPhase::Playing,
            locked: true,
            is_bot: true,
        })
        .unwrap();

        assert_eq!(listed.event.as_deref(), Some(EVENT_ROOM_LISTED));
        assert!(listed.data.contains(r#""isBot":true"#));
        assert!(receiver.try_recv().is_err());
    }
}
