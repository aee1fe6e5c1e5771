//! Authoritative per-room state and the diff records its mutators produce.
//!
//! Every mutator returns the [`StateChange`] it made so the room controller can forward
//! exactly that set to observers; nothing relies on observing the struct after the fact.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    board::{Board, Cell},
    state_machine::{InvalidTransition, Phase, RoomEvent, compute_transition},
};

/// One of the two participant slots, assigned in arrival order.
///
/// Encoded on the wire as `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Seat {
    /// First arrival, plays X and moves first.
    #[default]
    First,
    /// Second arrival (or the bot), plays O.
    Second,
}

impl Seat {
    /// Both seats in arrival order.
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    /// Seat for a zero-based arrival index.
    pub fn from_index(index: usize) -> Option<Seat> {
        Self::ALL.get(index).copied()
    }

    /// Zero-based index of the seat.
    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    /// The opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    /// Mark written on the board for moves of this seat.
    pub fn symbol(self) -> Cell {
        match self {
            Seat::First => Cell::X,
            Seat::Second => Cell::O,
        }
    }
}

impl From<Seat> for u8 {
    fn from(value: Seat) -> Self {
        value.index() as u8
    }
}

/// Raised when a wire value does not name a seat.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown seat {0}")]
pub struct UnknownSeat(pub u8);

impl TryFrom<u8> for Seat {
    type Error = UnknownSeat;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Seat::from_index(value as usize).ok_or(UnknownSeat(value))
    }
}

/// Incremental change to exactly one room field or board index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "camelCase")]
pub enum StateChange {
    /// A board cell received a mark.
    Board {
        /// Flat board index.
        index: usize,
        /// New cell content.
        value: Cell,
    },
    /// The seat expected to move changed.
    ActivePlayer {
        /// Seat now on turn.
        value: Seat,
    },
    /// A seat completed a line.
    WinningPlayer {
        /// The winner.
        value: Seat,
    },
    /// The room phase changed.
    GameState {
        /// New phase.
        value: Phase,
    },
    /// The board filled without a winner.
    IsDraw {
        /// Always `true` once emitted.
        value: bool,
    },
}

/// Whole-state copy sent once to a newly attached observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Board contents.
    pub board: Board,
    /// Seat expected to move.
    pub active_player: Seat,
    /// Room phase.
    pub game_state: Phase,
    /// Winner, once decided.
    pub winning_player: Option<Seat>,
    /// True once the board filled without a winner.
    pub is_draw: bool,
    /// Number of patches applied to reach this state.
    pub version: u64,
}

impl StateSnapshot {
    /// Apply one incremental change to this copy.
    pub fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::Board { index, value } => {
                self.board.set(index, value);
            }
            StateChange::ActivePlayer { value } => self.active_player = value,
            StateChange::WinningPlayer { value } => self.winning_player = Some(value),
            StateChange::GameState { value } => self.game_state = value,
            StateChange::IsDraw { value } => self.is_draw = value,
        }
    }
}

/// Mutations refused by [`RoomState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomStateError {
    /// The room already reached [`Phase::Finished`].
    #[error("room is finished; mutation refused")]
    Finished,
    /// The index is not on the board.
    #[error("cell index {0} is outside the board")]
    OutOfRange(usize),
    /// The cell already holds a mark.
    #[error("cell {0} is already occupied")]
    Occupied(usize),
    /// A winner or a draw was already recorded.
    #[error("outcome already decided")]
    AlreadyDecided,
    /// The phase state machine refused the event.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Authoritative mutable state for one match.
#[derive(Debug, Clone, Default)]
pub struct RoomState {
    board: Board,
    active_player: Seat,
    phase: Phase,
    winning_player: Option<Seat>,
    is_draw: bool,
    version: u64,
}

impl RoomState {
    /// Fresh state: empty board, seat 0 on turn, waiting for players.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Seat expected to move.
    pub fn active_player(&self) -> Seat {
        self.active_player
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Winner, once decided.
    pub fn winning_player(&self) -> Option<Seat> {
        self.winning_player
    }

    /// True once the board filled without a winner.
    pub fn is_draw(&self) -> bool {
        self.is_draw
    }

    /// Number of committed patches.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Copy the whole state for a newly attached observer.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            board: self.board,
            active_player: self.active_player,
            game_state: self.phase,
            winning_player: self.winning_player,
            is_draw: self.is_draw,
            version: self.version,
        }
    }

    /// Write `cell` at `index`. Occupied cells are never overwritten.
    pub fn place(&mut self, index: usize, cell: Cell) -> Result<StateChange, RoomStateError> {
        self.ensure_open()?;
        match self.board.get(index) {
            None => Err(RoomStateError::OutOfRange(index)),
            Some(current) if !current.is_empty() => Err(RoomStateError::Occupied(index)),
            Some(_) => {
                self.board.set(index, cell);
                Ok(StateChange::Board { index, value: cell })
            }
        }
    }

    /// Hand the turn to `seat`. Returns `None` when it already was on turn.
    pub fn set_active_player(&mut self, seat: Seat) -> Result<Option<StateChange>, RoomStateError> {
        self.ensure_open()?;
        if self.active_player == seat {
            return Ok(None);
        }
        self.active_player = seat;
        Ok(Some(StateChange::ActivePlayer { value: seat }))
    }

    /// Record `seat` as the winner.
    pub fn declare_winner(&mut self, seat: Seat) -> Result<StateChange, RoomStateError> {
        self.ensure_undecided()?;
        self.winning_player = Some(seat);
        Ok(StateChange::WinningPlayer { value: seat })
    }

    /// Record a draw.
    pub fn declare_draw(&mut self) -> Result<StateChange, RoomStateError> {
        self.ensure_undecided()?;
        self.is_draw = true;
        Ok(StateChange::IsDraw { value: true })
    }

    /// Drive the phase state machine.
    pub fn apply_event(&mut self, event: RoomEvent) -> Result<StateChange, RoomStateError> {
        let next = compute_transition(self.phase, event)?;
        self.phase = next;
        Ok(StateChange::GameState { value: next })
    }

    /// Seal a batch of changes, returning the version observers should see for it.
    pub fn commit(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn ensure_open(&self) -> Result<(), RoomStateError> {
        if self.phase == Phase::Finished {
            Err(RoomStateError::Finished)
        } else {
            Ok(())
        }
    }

    fn ensure_undecided(&self) -> Result<(), RoomStateError> {
        self.ensure_open()?;
        if self.winning_player.is_some() || self.is_draw {
            Err(RoomStateError::AlreadyDecided)
        } else {
            Ok(())
        }
    }
}
