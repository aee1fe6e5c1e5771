//! Command pipeline applied once per inbound selection.
//!
//! The stages run in a fixed order: selection, resolution, turn advance. They operate on a
//! scratch copy of the room state that replaces the live one only when every stage
//! succeeded, so a rejected selection never leaves a partial mutation behind.

use thiserror::Error;

use super::{
    room::{RoomState, RoomStateError, Seat, StateChange},
    state_machine::{FinishReason, Phase, RoomEvent},
};

/// Who asked for a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOrigin {
    /// A seated client; the move must arrive on that seat's turn.
    Seat,
    /// The room's registered bot seat, trusted to act on the turn it was scheduled for.
    Bot,
}

/// A request to mark one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Acting seat; its symbol is written on the board.
    pub seat: Seat,
    /// Target cell.
    pub index: usize,
    /// Origin of the move.
    pub origin: MoveOrigin,
}

/// Tagged outcome of the resolution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No terminal outcome; the turn passed to the other seat.
    Continue,
    /// The seat on turn completed a line.
    Won(Seat),
    /// The board filled without a line.
    Draw,
}

/// Result of an accepted selection: the ordered changes to broadcast as one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Changes in production order (write, then outcome or turn flip).
    pub changes: Vec<StateChange>,
    /// How the selection resolved.
    pub resolution: Resolution,
}

/// Reasons a selection is dropped. Never surfaced to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionRejected {
    /// Moves are only accepted while playing.
    #[error("room is not playing (phase {0:?})")]
    NotPlaying(Phase),
    /// The index is not on the board.
    #[error("cell index {0} is outside the board")]
    OutOfRange(usize),
    /// The target cell already holds a mark.
    #[error("cell {0} is already occupied")]
    Occupied(usize),
    /// A seated client moved outside its turn.
    #[error("seat {seat:?} moved while {active:?} is on turn")]
    NotYourTurn {
        /// Seat that sent the move.
        seat: Seat,
        /// Seat actually on turn.
        active: Seat,
    },
    /// The room state refused a mutation the checks above should have prevented.
    #[error("room state refused the selection: {0}")]
    Refused(#[from] RoomStateError),
}

/// Run every stage for `selection`, committing the result into `state` on success.
pub fn run(state: &mut RoomState, selection: Selection) -> Result<Applied, SelectionRejected> {
    let mut scratch = state.clone();
    let mut changes = Vec::with_capacity(3);

    changes.push(select(&mut scratch, selection)?);
    let resolution = resolve(&mut scratch, &mut changes)?;
    if resolution == Resolution::Continue {
        advance(&mut scratch, &mut changes)?;
    }

    *state = scratch;
    Ok(Applied {
        changes,
        resolution,
    })
}

/// Selection stage: validate the move and write the acting seat's mark.
fn select(state: &mut RoomState, selection: Selection) -> Result<StateChange, SelectionRejected> {
    let Selection {
        seat,
        index,
        origin,
    } = selection;

    if state.phase() != Phase::Playing {
        return Err(SelectionRejected::NotPlaying(state.phase()));
    }

    match state.board().get(index) {
        None => return Err(SelectionRejected::OutOfRange(index)),
        Some(cell) if !cell.is_empty() => return Err(SelectionRejected::Occupied(index)),
        Some(_) => {}
    }

    if origin == MoveOrigin::Seat && seat != state.active_player() {
        return Err(SelectionRejected::NotYourTurn {
            seat,
            active: state.active_player(),
        });
    }

    Ok(state.place(index, seat.symbol())?)
}

/// Resolution stage: detect a win or a draw and close the room when one occurred.
fn resolve(
    state: &mut RoomState,
    changes: &mut Vec<StateChange>,
) -> Result<Resolution, SelectionRejected> {
    let resolution = if state.board().winning_line().is_some() {
        let winner = state.active_player();
        changes.push(state.declare_winner(winner)?);
        Resolution::Won(winner)
    } else if state.board().is_full() {
        changes.push(state.declare_draw()?);
        Resolution::Draw
    } else {
        return Ok(Resolution::Continue);
    };

    changes.push(state.apply_event(RoomEvent::Finish(FinishReason::Decided))?);
    Ok(resolution)
}

/// Turn-advance stage: hand the turn to the other seat.
fn advance(state: &mut RoomState, changes: &mut Vec<StateChange>) -> Result<(), SelectionRejected> {
    let next = state.active_player().other();
    changes.extend(state.set_active_player(next)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::Cell;

    fn playing() -> RoomState {
        let mut state = RoomState::new();
        state.apply_event(RoomEvent::SeatsFilled).unwrap();
        state
    }

    fn by(seat: Seat, index: usize) -> Selection {
        Selection {
            seat,
            index,
            origin: MoveOrigin::Seat,
        }
    }

    #[test]
    fn accepted_move_writes_then_flips_turn() {
        let mut state = playing();
        let applied = run(&mut state, by(Seat::First, 4)).unwrap();
        assert_eq!(applied.resolution, Resolution::Continue);
        assert_eq!(
            applied.changes,
            vec![
                StateChange::Board {
                    index: 4,
                    value: Cell::X
                },
                StateChange::ActivePlayer {
                    value: Seat::Second
                },
            ]
        );
        assert_eq!(state.active_player(), Seat::Second);
    }

    #[test]
    fn turn_alternates_on_every_accepted_move() {
        let mut state = playing();
        for (step, index) in [0, 4, 8, 2, 6].into_iter().enumerate() {
            let before = state.active_player();
            let seat = if step % 2 == 0 { Seat::First } else { Seat::Second };
            assert_eq!(before, seat);
            let applied = run(&mut state, by(seat, index)).unwrap();
            if applied.resolution == Resolution::Continue {
                assert_eq!(state.active_player(), before.other());
            }
        }
    }

    #[test]
    fn occupied_cell_is_dropped_without_change() {
        let mut state = playing();
        run(&mut state, by(Seat::First, 0)).unwrap();
        let before = state.snapshot();
        assert_eq!(
            run(&mut state, by(Seat::Second, 0)),
            Err(SelectionRejected::Occupied(0))
        );
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn out_of_turn_move_is_dropped() {
        let mut state = playing();
        let before = state.snapshot();
        assert_eq!(
            run(&mut state, by(Seat::Second, 3)),
            Err(SelectionRejected::NotYourTurn {
                seat: Seat::Second,
                active: Seat::First
            })
        );
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn moves_outside_playing_are_dropped() {
        let mut state = RoomState::new();
        assert_eq!(
            run(&mut state, by(Seat::First, 0)),
            Err(SelectionRejected::NotPlaying(Phase::WaitingForPlayers))
        );
    }

    #[test]
    fn out_of_range_index_is_dropped() {
        let mut state = playing();
        assert_eq!(
            run(&mut state, by(Seat::First, 12)),
            Err(SelectionRejected::OutOfRange(12))
        );
    }

    #[test]
    fn bot_origin_bypasses_turn_check_with_own_symbol() {
        let mut state = playing();
        let applied = run(
            &mut state,
            Selection {
                seat: Seat::Second,
                index: 2,
                origin: MoveOrigin::Bot,
            },
        )
        .unwrap();
        assert_eq!(
            applied.changes[0],
            StateChange::Board {
                index: 2,
                value: Cell::O
            }
        );
    }

    #[test]
    fn completing_a_line_wins_and_finishes() {
        let mut state = playing();
        for (seat, index) in [
            (Seat::First, 0),
            (Seat::Second, 3),
            (Seat::First, 1),
            (Seat::Second, 4),
        ] {
            run(&mut state, by(seat, index)).unwrap();
        }
        let applied = run(&mut state, by(Seat::First, 2)).unwrap();
        assert_eq!(applied.resolution, Resolution::Won(Seat::First));
        assert_eq!(
            applied.changes,
            vec![
                StateChange::Board {
                    index: 2,
                    value: Cell::X
                },
                StateChange::WinningPlayer { value: Seat::First },
                StateChange::GameState {
                    value: Phase::Finished
                },
            ]
        );
        assert_eq!(state.phase(), Phase::Finished);
        assert_eq!(state.active_player(), Seat::First);
        assert!(!state.is_draw());

        let before = state.snapshot();
        assert!(run(&mut state, by(Seat::Second, 8)).is_err());
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn filling_the_board_without_line_is_a_draw() {
        // X O X
        // X O O
        // O X X
        let mut state = playing();
        let moves = [
            (Seat::First, 0),
            (Seat::Second, 1),
            (Seat::First, 2),
            (Seat::Second, 4),
            (Seat::First, 3),
            (Seat::Second, 5),
            (Seat::First, 7),
            (Seat::Second, 6),
        ];
        for (seat, index) in moves {
            assert_eq!(
                run(&mut state, by(seat, index)).unwrap().resolution,
                Resolution::Continue
            );
        }
        let applied = run(&mut state, by(Seat::First, 8)).unwrap();
        assert_eq!(applied.resolution, Resolution::Draw);
        assert!(state.is_draw());
        assert!(state.board().is_full());
        assert_eq!(state.board().winning_line(), None);
        assert_eq!(state.winning_player(), None);
        assert_eq!(
            applied.changes.last(),
            Some(&StateChange::GameState {
                value: Phase::Finished
            })
        );
    }
}
