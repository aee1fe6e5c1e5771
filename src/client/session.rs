//! Client-side mirror of a room, rebuilt purely from the messages the room sends.

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dto::ws::{ClientMessage, PlayerSelection, RoomMessage},
    state::{
        board::{CELL_COUNT, Cell},
        room::{Seat, StateChange, StateSnapshot},
        state_machine::Phase,
        sync::ObserverRx,
    },
};

use super::connector::{Connection, LinkClosed, RoomLink};

/// Discrete notifications raised while the mirror follows the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The room told us which seat we hold.
    SeatAssigned(Seat),
    /// A full snapshot replaced the mirror.
    Synchronized(StateSnapshot),
    /// A board cell received a mark.
    CellChanged { index: usize, cell: Cell },
    TurnChanged(Seat),
    PhaseChanged(Phase),
    Won(Seat),
    Draw,
    /// The other seat left while the match was in progress.
    Aborted,
}

/// Reasons a selection never left the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocalRejection {
    #[error("no seat or snapshot received yet")]
    NotSeated,
    #[error("match is not playing (phase {0:?})")]
    NotPlaying(Phase),
    #[error("cell index {0} is outside the board")]
    OutOfRange(usize),
    #[error("cell {0} is already occupied")]
    Occupied(usize),
    #[error("waiting for the other seat")]
    NotYourTurn,
    #[error("cell {0} was already submitted")]
    AwaitingConfirmation(usize),
    #[error(transparent)]
    LinkClosed(#[from] LinkClosed),
}

type Listener = Box<dyn FnMut(&SessionEvent) + Send>;

/// Read-only mirror of a room plus the means to submit moves to it.
///
/// The mirror is never mutated speculatively. The only local bookkeeping is the set of
/// cells submitted but not yet confirmed, which stay unselectable until the room's patch
/// arrives.
pub struct ClientSession {
    link: Box<dyn RoomLink>,
    seat: Option<Seat>,
    mirror: Option<StateSnapshot>,
    pending: [bool; CELL_COUNT],
    bot_controlled: bool,
    listeners: Vec<Listener>,
}

impl ClientSession {
    /// Session over `link`, waiting for its seat and snapshot.
    pub fn new(link: Box<dyn RoomLink>) -> Self {
        Self {
            link,
            seat: None,
            mirror: None,
            pending: [false; CELL_COUNT],
            bot_controlled: false,
            listeners: Vec::new(),
        }
    }

    /// Session for an admitted seat, returned with the seat's inbound queue.
    pub fn connected(connection: Connection) -> (Self, ObserverRx) {
        let Connection {
            seat,
            inbound,
            link,
        } = connection;
        let mut session = Self::new(link);
        session.seat = Some(seat);
        (session, inbound)
    }

    /// Mark the session as driven by the room's bot: selections carry the bot flag.
    pub fn bot_controlled(mut self) -> Self {
        self.bot_controlled = true;
        self
    }

    /// Register a listener invoked for every event, in order.
    pub fn on_event(&mut self, listener: impl FnMut(&SessionEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn seat(&self) -> Option<Seat> {
        self.seat
    }

    /// Latest mirrored state, once the snapshot arrived.
    pub fn mirror(&self) -> Option<&StateSnapshot> {
        self.mirror.as_ref()
    }

    /// True while playing and our seat is on turn.
    pub fn is_my_turn(&self) -> bool {
        match (self.seat, self.mirror.as_ref()) {
            (Some(seat), Some(mirror)) => {
                mirror.game_state == Phase::Playing && mirror.active_player == seat
            }
            _ => false,
        }
    }

    /// Whether a click on `index` would be submitted.
    pub fn is_selectable(&self, index: usize) -> bool {
        self.check_selection(index).is_ok()
    }

    /// Apply one room message to the mirror and notify listeners.
    pub fn handle(&mut self, message: RoomMessage) -> Vec<SessionEvent> {
        let events = match message {
            RoomMessage::PlayerIndex { player_index } => {
                self.seat = Some(player_index);
                vec![SessionEvent::SeatAssigned(player_index)]
            }
            RoomMessage::State { state } => self.synchronize(state),
            RoomMessage::Patch { version, changes } => self.apply_patch(version, changes),
            RoomMessage::PlayerDisconnected { player_index } => self.seat_left(player_index),
        };

        for event in &events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
        events
    }

    /// Submit a selection for `index`, unless the mirror already shows it cannot succeed.
    pub fn select(&mut self, index: usize) -> Result<(), LocalRejection> {
        self.check_selection(index)?;
        self.link
            .send(ClientMessage::PlayerSelection(PlayerSelection {
                index,
                is_bot_turn: self.bot_controlled,
            }))?;
        self.pending[index] = true;
        Ok(())
    }

    /// Ask the room to close the match.
    pub fn finish(&self) -> Result<(), LocalRejection> {
        self.link.send(ClientMessage::FinishGame)?;
        Ok(())
    }

    fn check_selection(&self, index: usize) -> Result<(), LocalRejection> {
        let (Some(seat), Some(mirror)) = (self.seat, self.mirror.as_ref()) else {
            return Err(LocalRejection::NotSeated);
        };
        if mirror.game_state != Phase::Playing {
            return Err(LocalRejection::NotPlaying(mirror.game_state));
        }
        match mirror.board.get(index) {
            None => return Err(LocalRejection::OutOfRange(index)),
            Some(cell) if !cell.is_empty() => return Err(LocalRejection::Occupied(index)),
            Some(_) => {}
        }
        if self.pending[index] {
            return Err(LocalRejection::AwaitingConfirmation(index));
        }
        if !self.bot_controlled && mirror.active_player != seat {
            return Err(LocalRejection::NotYourTurn);
        }
        Ok(())
    }

    fn synchronize(&mut self, snapshot: StateSnapshot) -> Vec<SessionEvent> {
        if self
            .mirror
            .is_some_and(|mirror| snapshot.version < mirror.version)
        {
            debug!(version = snapshot.version, "stale snapshot ignored");
            return Vec::new();
        }
        self.mirror = Some(snapshot);
        self.pending = [false; CELL_COUNT];
        vec![SessionEvent::Synchronized(snapshot)]
    }

    fn apply_patch(&mut self, version: u64, changes: Vec<StateChange>) -> Vec<SessionEvent> {
        let Some(mirror) = self.mirror.as_mut() else {
            warn!(version, "patch received before snapshot; ignoring");
            return Vec::new();
        };
        if version <= mirror.version {
            debug!(version, mirror = mirror.version, "duplicate patch ignored");
            return Vec::new();
        }
        if version > mirror.version + 1 {
            warn!(
                expected = mirror.version + 1,
                version, "patch gap detected; applying anyway"
            );
        }

        let mut events = Vec::with_capacity(changes.len());
        for change in changes {
            mirror.apply(change);
            let event = match change {
                StateChange::Board { index, value } => {
                    if let Some(pending) = self.pending.get_mut(index) {
                        *pending = false;
                    }
                    SessionEvent::CellChanged { index, cell: value }
                }
                StateChange::ActivePlayer { value } => SessionEvent::TurnChanged(value),
                StateChange::WinningPlayer { value } => SessionEvent::Won(value),
                StateChange::GameState { value } => SessionEvent::PhaseChanged(value),
                StateChange::IsDraw { value: true } => SessionEvent::Draw,
                StateChange::IsDraw { value: false } => continue,
            };
            events.push(event);
        }
        mirror.version = version;
        events
    }

    fn seat_left(&mut self, seat: Seat) -> Vec<SessionEvent> {
        let playing = self
            .mirror
            .is_some_and(|mirror| mirror.game_state == Phase::Playing);
        if playing && self.seat != Some(seat) {
            vec![SessionEvent::Aborted]
        } else {
            debug!(?seat, playing, "seat left outside of play");
            Vec::new()
        }
    }
}
