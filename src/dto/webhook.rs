use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::format_system_time;

/// `event_type` of the match-end report.
pub const MATCH_ENDED: &str = "match_ended";
/// `event_type` and `error_code` of the match-abort report.
pub const MATCH_ABORTED: &str = "match_aborted";
/// Winner reported for a drawn match.
pub const NO_WINNER: &str = "There is no winner";

/// Envelope shared by every lifecycle report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload<D> {
    pub token: String,
    pub event_type: String,
    pub message: String,
    pub data: D,
}

/// Result of a decided match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEndData {
    pub event_type: String,
    pub datetime: String,
    pub winner: String,
    #[serde(rename = "player1Score")]
    pub player1_score: u8,
    #[serde(rename = "player2Score")]
    pub player2_score: u8,
}

/// Details of a match cut short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAbortData {
    pub datetime: String,
    pub event_type: String,
    pub error_code: String,
    pub error_description: String,
}

impl WebhookPayload<MatchEndData> {
    /// Match-end report naming `winner` with the given per-seat scores.
    pub fn match_ended(token: &str, winner: &str, scores: [u8; 2], at: SystemTime) -> Self {
        Self {
            token: token.to_string(),
            event_type: MATCH_ENDED.to_string(),
            message: "Match has ended".to_string(),
            data: MatchEndData {
                event_type: MATCH_ENDED.to_string(),
                datetime: format_system_time(at),
                winner: winner.to_string(),
                player1_score: scores[0],
                player2_score: scores[1],
            },
        }
    }
}

impl WebhookPayload<MatchAbortData> {
    /// Match-abort report.
    pub fn match_aborted(token: &str, at: SystemTime) -> Self {
        Self {
            token: token.to_string(),
            event_type: MATCH_ABORTED.to_string(),
            message: "Match has aborted".to_string(),
            data: MatchAbortData {
                datetime: format_system_time(at),
                event_type: MATCH_ABORTED.to_string(),
                error_code: MATCH_ABORTED.to_string(),
                error_description: "match has aborted".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn match_end_payload_uses_wire_field_names() {
        let at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let payload = WebhookPayload::match_ended("tok", "alice", [1, 0], at);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "token": "tok",
                "event_type": "match_ended",
                "message": "Match has ended",
                "data": {
                    "event_type": "match_ended",
                    "datetime": "2023-11-14T22:13:20Z",
                    "winner": "alice",
                    "player1Score": 1,
                    "player2Score": 0
                }
            })
        );
    }

    #[test]
    fn abort_payload_carries_error_code() {
        let payload = WebhookPayload::match_aborted("tok", UNIX_EPOCH);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event_type"], "match_aborted");
        assert_eq!(json["message"], "Match has aborted");
        assert_eq!(json["data"]["error_code"], "match_aborted");
        assert_eq!(json["data"]["error_description"], "match has aborted");
        assert_eq!(json["data"]["datetime"], "1970-01-01T00:00:00Z");
    }
}
