use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::room::RoomSummary;

#[derive(Clone, Debug)]
/// Dispatched payload carried across the room listing stream.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already encoded data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a room is created or its listing entry changes.
pub struct RoomListedEvent {
    pub room: RoomSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a room is torn down and leaves the registry.
#[serde(rename_all = "camelCase")]
pub struct RoomDisposedEvent {
    pub match_id: String,
}
