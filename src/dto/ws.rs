use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::state::room::{Seat, StateChange, StateSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Messages pushed from a room to each attached observer, in production order.
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoomMessage {
    /// Seat assigned to the receiving client, sent once right after admission.
    #[serde(rename_all = "camelCase")]
    PlayerIndex { player_index: Seat },
    /// Whole-state snapshot, sent once per attachment before any patch.
    State { state: StateSnapshot },
    /// Changes produced by one accepted command, applied in order.
    Patch {
        version: u64,
        changes: Vec<StateChange>,
    },
    /// A seat left the room.
    #[serde(rename_all = "camelCase")]
    PlayerDisconnected { player_index: Seat },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Messages accepted from room clients.
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Request to mark a cell.
    PlayerSelection(PlayerSelection),
    /// Request to close a match whose outcome the client already observed.
    FinishGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
/// Payload of [`ClientMessage::PlayerSelection`].
#[serde(rename_all = "camelCase")]
pub struct PlayerSelection {
    #[validate(range(max = 8))]
    pub index: usize,
    #[serde(default)]
    pub is_bot_turn: bool,
}

/// Reasons an inbound frame is ignored.
#[derive(Debug, Error)]
pub enum ClientMessageError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, ClientMessageError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        if let ClientMessage::PlayerSelection(selection) = &message {
            selection.validate()?;
        }
        Ok(message)
    }
}
