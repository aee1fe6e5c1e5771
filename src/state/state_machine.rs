use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse lifecycle stage of a room.
///
/// Encoded on the wire as `0`, `1` and `2` in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    /// Seats are still being filled.
    #[default]
    WaitingForPlayers,
    /// Both seats are taken and moves are accepted.
    Playing,
    /// Terminal: no further mutation is accepted.
    Finished,
}

impl From<Phase> for u8 {
    fn from(value: Phase) -> Self {
        match value {
            Phase::WaitingForPlayers => 0,
            Phase::Playing => 1,
            Phase::Finished => 2,
        }
    }
}

/// Raised when a wire value does not name a phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase value {0}")]
pub struct UnknownPhase(pub u8);

impl TryFrom<u8> for Phase {
    type Error = UnknownPhase;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Phase::WaitingForPlayers),
            1 => Ok(Phase::Playing),
            2 => Ok(Phase::Finished),
            other => Err(UnknownPhase(other)),
        }
    }
}

/// Why a room reached [`Phase::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// A seat completed a line or the board filled up.
    Decided,
    /// A client explicitly asked to close the match.
    Requested,
    /// A seat left the room.
    SeatLost,
}

/// Events that can be applied to the phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// Every seat required to start is occupied.
    SeatsFilled,
    /// The match ended for the given reason.
    Finish(FinishReason),
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the room was in when the event was received.
    pub from: Phase,
    /// The rejected event.
    pub event: RoomEvent,
}

/// Compute the next phase for `event`, refusing anything that would move backwards
/// or leave [`Phase::Finished`].
pub fn compute_transition(from: Phase, event: RoomEvent) -> Result<Phase, InvalidTransition> {
    let next = match (from, event) {
        (Phase::WaitingForPlayers, RoomEvent::SeatsFilled) => Phase::Playing,
        (Phase::WaitingForPlayers, RoomEvent::Finish(FinishReason::SeatLost)) => Phase::Finished,
        (Phase::Playing, RoomEvent::Finish(_)) => Phase::Finished,
        (from, event) => return Err(InvalidTransition { from, event }),
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_monotonic() {
        let playing = compute_transition(Phase::WaitingForPlayers, RoomEvent::SeatsFilled).unwrap();
        assert_eq!(playing, Phase::Playing);
        let finished =
            compute_transition(playing, RoomEvent::Finish(FinishReason::Decided)).unwrap();
        assert_eq!(finished, Phase::Finished);
    }

    #[test]
    fn every_finish_reason_closes_a_playing_room() {
        for reason in [
            FinishReason::Decided,
            FinishReason::Requested,
            FinishReason::SeatLost,
        ] {
            assert_eq!(
                compute_transition(Phase::Playing, RoomEvent::Finish(reason)),
                Ok(Phase::Finished)
            );
        }
    }

    #[test]
    fn finished_is_terminal() {
        for event in [
            RoomEvent::SeatsFilled,
            RoomEvent::Finish(FinishReason::Requested),
            RoomEvent::Finish(FinishReason::SeatLost),
        ] {
            let err = compute_transition(Phase::Finished, event).unwrap_err();
            assert_eq!(err.from, Phase::Finished);
            assert_eq!(err.event, event);
        }
    }

    #[test]
    fn waiting_room_cannot_be_decided_or_refilled_twice() {
        assert!(
            compute_transition(
                Phase::WaitingForPlayers,
                RoomEvent::Finish(FinishReason::Decided)
            )
            .is_err()
        );
        assert!(compute_transition(Phase::Playing, RoomEvent::SeatsFilled).is_err());
    }

    #[test]
    fn waiting_room_closes_when_a_seat_leaves() {
        assert_eq!(
            compute_transition(
                Phase::WaitingForPlayers,
                RoomEvent::Finish(FinishReason::SeatLost)
            ),
            Ok(Phase::Finished)
        );
    }
}
