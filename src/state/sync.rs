use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dto::ws::RoomMessage;

use super::room::{Seat, StateChange, StateSnapshot};

/// Sending half of an observer's ordered message queue.
pub type ObserverTx = mpsc::UnboundedSender<RoomMessage>;
/// Receiving half handed to the connection that attached.
pub type ObserverRx = mpsc::UnboundedReceiver<RoomMessage>;

/// Handle used to push room messages to one attached seat.
#[derive(Debug, Clone)]
struct Observer {
    seat: Seat,
    tx: ObserverTx,
}

/// Fans room messages out to every attached observer.
///
/// Each observer owns a dedicated queue, so messages reach every observer in the order
/// they were produced here. A freshly attached observer always receives its seat and a
/// full snapshot before any patch.
#[derive(Debug, Default)]
pub struct SyncChannel {
    observers: Vec<Observer>,
}

impl SyncChannel {
    /// Empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer for `seat`, delivering its seat index and `snapshot` first.
    ///
    /// Replaces a previous observer registered for the same seat.
    pub fn attach(&mut self, seat: Seat, tx: ObserverTx, snapshot: StateSnapshot) {
        self.observers.retain(|observer| observer.seat != seat);

        let delivered = tx
            .send(RoomMessage::PlayerIndex { player_index: seat })
            .and_then(|_| tx.send(RoomMessage::State { state: snapshot }));
        if delivered.is_err() {
            warn!(?seat, "observer closed before its snapshot was delivered");
            return;
        }

        debug!(?seat, version = snapshot.version, "observer attached");
        self.observers.push(Observer { seat, tx });
    }

    /// Detach the observer for `seat`. Returns whether one was attached.
    pub fn detach(&mut self, seat: Seat) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.seat != seat);
        before != self.observers.len()
    }

    /// Deliver one committed batch of changes to every observer.
    pub fn publish(&mut self, version: u64, changes: Vec<StateChange>) {
        if changes.is_empty() {
            return;
        }
        self.broadcast(RoomMessage::Patch { version, changes });
    }

    /// Deliver a protocol message to every observer.
    pub fn broadcast(&mut self, message: RoomMessage) {
        self.observers.retain(|observer| {
            let alive = observer.tx.send(message.clone()).is_ok();
            if !alive {
                warn!(seat = ?observer.seat, "observer queue closed; dropping observer");
            }
            alive
        });
    }

    /// Seats that currently have an observer attached.
    pub fn seats(&self) -> Vec<Seat> {
        self.observers.iter().map(|observer| observer.seat).collect()
    }

    /// Number of attached observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// True when nobody is attached.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
