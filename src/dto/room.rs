use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::{room::StateSnapshot, state_machine::Phase};

/// Body of `POST /create-room/{matchId}`.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Seat the server-hosted bot in the second slot.
    #[serde(default)]
    pub is_bot: bool,
    /// Token forwarded to the match lifecycle webhook.
    #[serde(default)]
    #[validate(length(max = 512))]
    pub token: Option<String>,
    /// Display name of the first seat.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub player1_id: Option<String>,
    /// Display name of the second seat.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub player2_id: Option<String>,
}

/// Identifier of the room serving a match.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: Uuid,
}

/// Room phase as exposed over HTTP and SSE.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomPhase {
    /// Seats are still being filled.
    WaitingForPlayers,
    /// Match in progress.
    Playing,
    /// Match over.
    Finished,
}

impl From<Phase> for VisibleRoomPhase {
    fn from(value: Phase) -> Self {
        match value {
            Phase::WaitingForPlayers => VisibleRoomPhase::WaitingForPlayers,
            Phase::Playing => VisibleRoomPhase::Playing,
            Phase::Finished => VisibleRoomPhase::Finished,
        }
    }
}

/// Listing entry describing one live room.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub match_id: String,
    pub room_id: Uuid,
    /// Seats currently occupied (the bot included).
    pub clients: usize,
    pub phase: VisibleRoomPhase,
    /// True once the room stopped admitting seats.
    pub locked: bool,
    pub is_bot: bool,
}

/// Listing entry plus the current authoritative state.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetails {
    #[serde(flatten)]
    pub summary: RoomSummary,
    #[schema(value_type = Object)]
    pub state: StateSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_minimal_body() {
        let request: CreateRoomRequest = serde_json::from_str(r#"{"isBot":true}"#).unwrap();
        assert!(request.is_bot);
        assert!(request.token.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn create_request_rejects_oversized_names() {
        let request = CreateRoomRequest {
            player1_id: Some("x".repeat(65)),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
