use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use crate::{
    client::session::{ClientSession, SessionEvent},
    dto::ws::RoomMessage,
    state::{state_machine::Phase, sync::ObserverRx},
};

use super::strategy::BotStrategy;

/// Bot seat driven through a regular client session.
///
/// When the seat comes on turn a move is scheduled `settle_delay` later. The scheduled move
/// is dropped as soon as the match ends or the turn moves away.
pub struct BotAgent {
    session: ClientSession,
    strategy: BotStrategy,
    settle_delay: Duration,
    rng: StdRng,
    deadline: Option<Instant>,
}

/// Run a bot agent on its own task until the room closes its queue.
pub fn spawn(
    session: ClientSession,
    inbound: ObserverRx,
    strategy: BotStrategy,
    settle_delay: Duration,
) -> JoinHandle<()> {
    let agent = BotAgent::new(session, strategy, settle_delay, StdRng::from_os_rng());
    tokio::spawn(agent.run(inbound))
}

impl BotAgent {
    pub fn new(
        session: ClientSession,
        strategy: BotStrategy,
        settle_delay: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            session,
            strategy,
            settle_delay,
            rng,
            deadline: None,
        }
    }

    /// Follow the room until `inbound` closes.
    pub async fn run(mut self, mut inbound: ObserverRx) {
        info!(
            seat = ?self.session.seat(),
            difficulty = ?self.strategy.difficulty(),
            "bot agent started"
        );
        loop {
            let deadline = self.deadline;
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => self.observe(message),
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.deadline = None;
                    self.act();
                }
            }
        }
        debug!(seat = ?self.session.seat(), "bot agent stopped");
    }

    fn observe(&mut self, message: RoomMessage) {
        for event in self.session.handle(message) {
            match event {
                SessionEvent::Won(_)
                | SessionEvent::Draw
                | SessionEvent::Aborted
                | SessionEvent::PhaseChanged(Phase::Finished) => self.cancel(),
                SessionEvent::TurnChanged(_)
                | SessionEvent::PhaseChanged(_)
                | SessionEvent::Synchronized(_) => self.reschedule(),
                SessionEvent::SeatAssigned(_) | SessionEvent::CellChanged { .. } => {}
            }
        }
    }

    fn reschedule(&mut self) {
        if !self.session.is_my_turn() {
            self.cancel();
            return;
        }
        if self.deadline.is_none() {
            debug!(delay_ms = self.settle_delay.as_millis() as u64, "bot move scheduled");
            self.deadline = Some(Instant::now() + self.settle_delay);
        }
    }

    fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            debug!("scheduled bot move canceled");
        }
    }

    fn act(&mut self) {
        if !self.session.is_my_turn() {
            return;
        }
        let (Some(seat), Some(mirror)) = (self.session.seat(), self.session.mirror()) else {
            return;
        };
        let board = mirror.board;

        match self.strategy.choose(&board, seat.symbol(), &mut self.rng) {
            Some(index) => match self.session.select(index) {
                Ok(()) => info!(?seat, index, "bot selected cell"),
                Err(err) => warn!(?seat, index, error = %err, "bot selection rejected locally"),
            },
            None => debug!(?seat, "no empty cell left for the bot"),
        }
    }
}
