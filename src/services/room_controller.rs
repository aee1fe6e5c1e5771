//! One task per room owning its authoritative state.
//!
//! Every command reaching a room goes through a single queue, so selections, joins and
//! departures are applied strictly one after another and every observer sees the
//! resulting patches in the same order.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    bot::{agent, strategy::BotStrategy},
    client::{
        connector::{Connection, LinkClosed, RoomLink},
        session::ClientSession,
    },
    config::AppConfig,
    dto::{
        room::{RoomDetails, RoomSummary},
        ws::{ClientMessage, PlayerSelection, RoomMessage},
    },
    error::JoinError,
    services::{
        notifier::{self, MatchOutcome},
        sse_events,
    },
    state::{
        SharedState,
        context::{BotDifficulty, MatchContext},
        pipeline::{self, MoveOrigin, Resolution, Selection},
        room::{RoomState, Seat},
        state_machine::{FinishReason, Phase, RoomEvent},
        sync::SyncChannel,
    },
};

/// Requests accepted by a room task.
pub enum RoomCommand {
    /// Claim the next free seat.
    Join {
        reply: oneshot::Sender<Result<Connection, JoinError>>,
    },
    /// Message from an admitted seat.
    Client { seat: Seat, message: ClientMessage },
    /// An admitted seat went away.
    Leave { seat: Seat },
    /// Report the listing entry and current state.
    Describe { reply: oneshot::Sender<RoomDetails> },
}

/// Cloneable address of a running room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: Uuid,
    match_id: Arc<str>,
    is_bot: bool,
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn is_bot(&self) -> bool {
        self.is_bot
    }

    /// True once the room task stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Ask the room for a seat.
    pub async fn join(&self) -> Result<Connection, JoinError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(RoomCommand::Join { reply })
            .map_err(|_| JoinError::RoomClosed)?;
        response.await.map_err(|_| JoinError::RoomClosed)?
    }

    /// Listing entry plus current snapshot.
    pub async fn describe(&self) -> Result<RoomDetails, JoinError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(RoomCommand::Describe { reply })
            .map_err(|_| JoinError::RoomClosed)?;
        response.await.map_err(|_| JoinError::RoomClosed)
    }
}

/// Link for a seat admitted in-process. Dropping it releases the seat.
pub struct LocalLink {
    seat: Seat,
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomLink for LocalLink {
    fn send(&self, message: ClientMessage) -> Result<(), LinkClosed> {
        self.tx
            .send(RoomCommand::Client {
                seat: self.seat,
                message,
            })
            .map_err(|_| LinkClosed)
    }
}

impl Drop for LocalLink {
    fn drop(&mut self) {
        let _ = self.tx.send(RoomCommand::Leave { seat: self.seat });
    }
}

/// Per-room knobs taken from the application configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomSettings {
    pub settle_delay: Duration,
    pub strategic_probability: f64,
    pub empty_room_ttl: Duration,
}

impl From<&AppConfig> for RoomSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            settle_delay: config.bot.settle_delay,
            strategic_probability: config.bot.strategic_probability,
            empty_room_ttl: config.rooms.empty_room_ttl,
        }
    }
}

/// Start the task serving `context` and return its handle.
///
/// The caller registers the handle; the task removes its own registry entry when it stops.
pub fn spawn_room(state: SharedState, context: MatchContext) -> RoomHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let room_id = Uuid::new_v4();
    let handle = RoomHandle {
        room_id,
        match_id: Arc::from(context.match_id.as_str()),
        is_bot: context.bot_enabled(),
        tx: tx.clone(),
    };

    let controller = RoomController {
        room_id,
        settings: RoomSettings::from(state.config().as_ref()),
        context,
        room: RoomState::new(),
        sync: SyncChannel::new(),
        seats: [None, None],
        admitted: 0,
        reported: false,
        commands: tx.downgrade(),
        app: state,
    };
    tokio::spawn(controller.run(rx));
    handle
}

enum Occupant {
    Human,
    Bot(JoinHandle<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

struct RoomController {
    room_id: Uuid,
    settings: RoomSettings,
    context: MatchContext,
    room: RoomState,
    sync: SyncChannel,
    seats: [Option<Occupant>; 2],
    /// Seats admitted over the room's lifetime.
    admitted: usize,
    /// Set once lifecycle reports went out.
    reported: bool,
    commands: mpsc::WeakUnboundedSender<RoomCommand>,
    app: SharedState,
}

impl RoomController {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RoomCommand>) {
        info!(
            match_id = %self.context.match_id,
            room_id = %self.room_id,
            bot = ?self.context.bot,
            "room opened"
        );
        let expires_at = Instant::now() + self.settings.empty_room_ttl;

        loop {
            tokio::select! {
                command = rx.recv() => {
                    let Some(command) = command else {
                        debug!(match_id = %self.context.match_id, "every room handle dropped");
                        break;
                    };
                    if self.handle(command) == Flow::Close {
                        break;
                    }
                }
                _ = sleep_until(expires_at), if self.admitted == 0 => {
                    info!(
                        match_id = %self.context.match_id,
                        ttl_secs = self.settings.empty_room_ttl.as_secs(),
                        "no seat joined before the room expired"
                    );
                    break;
                }
            }
        }

        self.close();
    }

    fn handle(&mut self, command: RoomCommand) -> Flow {
        match command {
            RoomCommand::Join { reply } => {
                let _ = reply.send(self.admit());
                Flow::Continue
            }
            RoomCommand::Client { seat, message } => {
                if self.seats[seat.index()].is_none() {
                    debug!(?seat, "message from a vacated seat ignored");
                    return Flow::Continue;
                }
                match message {
                    ClientMessage::PlayerSelection(selection) => self.select(seat, selection),
                    ClientMessage::FinishGame => self.finish_requested(seat),
                }
                Flow::Continue
            }
            RoomCommand::Leave { seat } => self.leave(seat),
            RoomCommand::Describe { reply } => {
                let _ = reply.send(self.details());
                Flow::Continue
            }
        }
    }

    fn admit(&mut self) -> Result<Connection, JoinError> {
        if self.room.phase() != Phase::WaitingForPlayers {
            return Err(JoinError::RoomLocked);
        }
        let seat = Seat::ALL
            .into_iter()
            .find(|seat| self.seats[seat.index()].is_none())
            .ok_or(JoinError::RoomFull)?;

        let connection = self.attach(seat)?;
        self.seats[seat.index()] = Some(Occupant::Human);
        self.admitted += 1;
        info!(match_id = %self.context.match_id, ?seat, "seat admitted");

        if let (Some(bot_seat), Some(difficulty)) = (self.context.bot_seat(), self.context.bot) {
            if self.seats[bot_seat.index()].is_none() {
                self.seat_bot(bot_seat, difficulty)?;
            }
        }

        if self.seats.iter().all(Option::is_some) {
            self.start();
        }
        self.publish_listing();
        Ok(connection)
    }

    fn attach(&mut self, seat: Seat) -> Result<Connection, JoinError> {
        let commands = self.commands.upgrade().ok_or(JoinError::RoomClosed)?;
        let (tx, inbound) = mpsc::unbounded_channel();
        self.sync.attach(seat, tx, self.room.snapshot());
        Ok(Connection {
            seat,
            inbound,
            link: Box::new(LocalLink { seat, tx: commands }),
        })
    }

    fn seat_bot(&mut self, seat: Seat, difficulty: BotDifficulty) -> Result<(), JoinError> {
        let (session, inbound) = ClientSession::connected(self.attach(seat)?);
        let strategy = BotStrategy::new(difficulty, self.settings.strategic_probability);
        let task = agent::spawn(
            session.bot_controlled(),
            inbound,
            strategy,
            self.settings.settle_delay,
        );
        self.seats[seat.index()] = Some(Occupant::Bot(task));
        self.admitted += 1;
        info!(match_id = %self.context.match_id, ?seat, ?difficulty, "bot seated");
        Ok(())
    }

    fn start(&mut self) {
        match self.room.apply_event(RoomEvent::SeatsFilled) {
            Ok(change) => {
                let version = self.room.commit();
                self.sync.publish(version, vec![change]);
                info!(match_id = %self.context.match_id, "match started");
            }
            Err(err) => warn!(match_id = %self.context.match_id, error = %err, "failed to start match"),
        }
    }

    fn select(&mut self, seat: Seat, selection: PlayerSelection) {
        let origin = match (selection.is_bot_turn, self.is_bot_seat(seat)) {
            (true, true) => MoveOrigin::Bot,
            (true, false) => {
                debug!(?seat, "bot flag from a human seat ignored");
                MoveOrigin::Seat
            }
            (false, _) => MoveOrigin::Seat,
        };

        let applied = match pipeline::run(
            &mut self.room,
            Selection {
                seat,
                index: selection.index,
                origin,
            },
        ) {
            Ok(applied) => applied,
            Err(rejected) => {
                debug!(?seat, index = selection.index, reason = %rejected, "selection dropped");
                return;
            }
        };

        let version = self.room.commit();
        debug!(?seat, index = selection.index, version, "selection applied");
        self.sync.publish(version, applied.changes);

        match applied.resolution {
            Resolution::Continue => {}
            Resolution::Won(winner) => self.finished(MatchOutcome::Won(winner)),
            Resolution::Draw => self.finished(MatchOutcome::Draw),
        }
    }

    fn finish_requested(&mut self, seat: Seat) {
        match self
            .room
            .apply_event(RoomEvent::Finish(FinishReason::Requested))
        {
            Ok(change) => {
                let version = self.room.commit();
                self.sync.publish(version, vec![change]);
                self.finished(MatchOutcome::Closed);
            }
            Err(err) => debug!(?seat, error = %err, "finish request ignored"),
        }
    }

    fn leave(&mut self, seat: Seat) -> Flow {
        let Some(occupant) = self.seats[seat.index()].take() else {
            debug!(?seat, "leave for an empty seat ignored");
            return Flow::Continue;
        };
        if let Occupant::Bot(task) = occupant {
            task.abort();
        }
        self.sync.detach(seat);
        info!(match_id = %self.context.match_id, ?seat, "seat left");

        self.sync.broadcast(RoomMessage::PlayerDisconnected { player_index: seat });

        let phase = self.room.phase();
        if phase != Phase::Finished {
            match self
                .room
                .apply_event(RoomEvent::Finish(FinishReason::SeatLost))
            {
                Ok(change) => {
                    let version = self.room.commit();
                    self.sync.publish(version, vec![change]);
                    if phase == Phase::Playing {
                        self.finished(MatchOutcome::Forfeit {
                            remaining: seat.other(),
                        });
                    }
                }
                Err(err) => warn!(?seat, error = %err, "failed to finish after seat loss"),
            }
        }

        let humans = self
            .seats
            .iter()
            .filter(|occupant| matches!(occupant, Some(Occupant::Human)))
            .count();
        if humans == 0 {
            Flow::Close
        } else {
            self.publish_listing();
            Flow::Continue
        }
    }

    fn finished(&mut self, outcome: MatchOutcome) {
        info!(match_id = %self.context.match_id, ?outcome, "match finished");
        self.publish_listing();
        if self.reported {
            return;
        }
        self.reported = true;
        let reports = notifier::reports_for(&self.context, outcome, SystemTime::now());
        notifier::dispatch(self.app.notifier(), &self.context.match_id, reports);
    }

    fn is_bot_seat(&self, seat: Seat) -> bool {
        matches!(self.seats[seat.index()], Some(Occupant::Bot(_)))
    }

    fn summary(&self) -> RoomSummary {
        let clients = self.seats.iter().filter(|occupant| occupant.is_some()).count();
        let phase = self.room.phase();
        RoomSummary {
            match_id: self.context.match_id.clone(),
            room_id: self.room_id,
            clients,
            phase: phase.into(),
            locked: phase != Phase::WaitingForPlayers || clients == self.seats.len(),
            is_bot: self.context.bot_enabled(),
        }
    }

    fn details(&self) -> RoomDetails {
        RoomDetails {
            summary: self.summary(),
            state: self.room.snapshot(),
        }
    }

    fn publish_listing(&self) {
        sse_events::broadcast_room_updated(&self.app, self.summary());
    }

    fn close(mut self) {
        for occupant in self.seats.iter_mut().filter_map(Option::take) {
            if let Occupant::Bot(task) = occupant {
                task.abort();
            }
        }
        if self
            .app
            .rooms()
            .remove_room(&self.context.match_id, self.room_id)
        {
            sse_events::broadcast_room_disposed(&self.app, &self.context.match_id);
        }
        info!(
            match_id = %self.context.match_id,
            room_id = %self.room_id,
            "room closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{BotConfig, RoomsConfig},
        services::notifier::{MatchReport, tests::RecordingNotifier},
        state::{
            AppState,
            board::Cell,
            room::{StateChange, StateSnapshot},
            sync::ObserverRx,
        },
    };

    struct Fixture {
        state: SharedState,
        recorder: Arc<RecordingNotifier>,
    }

    fn fixture(empty_room_ttl: Duration) -> Fixture {
        let config = AppConfig {
            bot: BotConfig {
                settle_delay: Duration::from_millis(5),
                ..Default::default()
            },
            rooms: RoomsConfig { empty_room_ttl },
            ..Default::default()
        };
        let recorder = Arc::new(RecordingNotifier::default());
        let state = AppState::with_notifier(config, recorder.clone());
        Fixture { state, recorder }
    }

    fn open(fixture: &Fixture, bot: Option<BotDifficulty>) -> RoomHandle {
        let context = MatchContext::new(
            "m-1",
            "tok",
            Some("alice".into()),
            Some("bob".into()),
            bot,
        );
        let state = fixture.state.clone();
        let (handle, created) = fixture
            .state
            .rooms()
            .get_or_insert_with("m-1", || spawn_room(state, context));
        assert!(created);
        handle
    }

    fn drain(rx: &mut ObserverRx) -> Vec<RoomMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn mirror(messages: &[RoomMessage]) -> StateSnapshot {
        let mut mirror = StateSnapshot::default();
        for message in messages {
            match message {
                RoomMessage::State { state } => mirror = *state,
                RoomMessage::Patch { version, changes } => {
                    changes.iter().for_each(|change| mirror.apply(*change));
                    mirror.version = *version;
                }
                _ => {}
            }
        }
        mirror
    }

    fn play(connection: &Connection, index: usize) {
        connection
            .link
            .send(ClientMessage::PlayerSelection(PlayerSelection {
                index,
                is_bot_turn: false,
            }))
            .unwrap();
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn seats_follow_arrival_order_and_lock_when_full() {
        let fixture = fixture(Duration::from_secs(60));
        let room = open(&fixture, None);

        let mut first = room.join().await.unwrap();
        let mut second = room.join().await.unwrap();
        assert_eq!(first.seat, Seat::First);
        assert_eq!(second.seat, Seat::Second);
        assert!(matches!(room.join().await, Err(JoinError::RoomLocked)));

        let seen = drain(&mut first.inbound);
        assert_eq!(
            seen[0],
            RoomMessage::PlayerIndex {
                player_index: Seat::First
            }
        );
        assert!(matches!(seen[1], RoomMessage::State { .. }));
        assert_eq!(mirror(&seen).game_state, Phase::Playing);
        assert_eq!(mirror(&drain(&mut second.inbound)).game_state, Phase::Playing);

        let details = room.describe().await.unwrap();
        assert_eq!(details.summary.clients, 2);
        assert!(details.summary.locked);
    }

    #[tokio::test]
    async fn win_is_mirrored_everywhere_and_reported_once() {
        let fixture = fixture(Duration::from_secs(60));
        let room = open(&fixture, None);
        let mut first = room.join().await.unwrap();
        let mut second = room.join().await.unwrap();

        for (connection, index) in [(&first, 0), (&second, 3), (&first, 1), (&second, 4), (&first, 2)] {
            play(connection, index);
        }
        first.link.send(ClientMessage::FinishGame).unwrap();
        settle().await;

        let details = room.describe().await.unwrap();
        assert_eq!(details.state.winning_player, Some(Seat::First));
        assert_eq!(details.state.game_state, Phase::Finished);
        assert_eq!(mirror(&drain(&mut first.inbound)), details.state);
        assert_eq!(mirror(&drain(&mut second.inbound)), details.state);

        let reports = fixture.recorder.reports();
        let [MatchReport::Ended(payload)] = reports.as_slice() else {
            panic!("expected one match end report, got {reports:?}");
        };
        assert_eq!(payload.data.winner, "alice");
        assert_eq!((payload.data.player1_score, payload.data.player2_score), (1, 0));
    }

    #[tokio::test]
    async fn out_of_turn_and_spoofed_bot_moves_are_dropped() {
        let fixture = fixture(Duration::from_secs(60));
        let room = open(&fixture, None);
        let _first = room.join().await.unwrap();
        let second = room.join().await.unwrap();
        let before = room.describe().await.unwrap().state;

        play(&second, 4);
        second
            .link
            .send(ClientMessage::PlayerSelection(PlayerSelection {
                index: 4,
                is_bot_turn: true,
            }))
            .unwrap();
        settle().await;

        assert_eq!(room.describe().await.unwrap().state, before);
    }

    #[tokio::test]
    async fn disconnect_mid_match_aborts_once() {
        let fixture = fixture(Duration::from_secs(60));
        let room = open(&fixture, None);
        let first = room.join().await.unwrap();
        let mut second = room.join().await.unwrap();
        play(&first, 0);
        settle().await;
        drain(&mut second.inbound);

        drop(first);
        settle().await;

        let seen = drain(&mut second.inbound);
        assert_eq!(
            seen,
            vec![
                RoomMessage::PlayerDisconnected {
                    player_index: Seat::First
                },
                RoomMessage::Patch {
                    version: 3,
                    changes: vec![StateChange::GameState {
                        value: Phase::Finished
                    }],
                },
            ]
        );

        let reports = fixture.recorder.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].endpoint(), "match_aborted");
        let MatchReport::Ended(payload) = &reports[1] else {
            panic!("expected match end report last");
        };
        assert_eq!(payload.data.winner, "bob");
        assert_eq!((payload.data.player1_score, payload.data.player2_score), (0, 0));

        drop(second);
        settle().await;
        assert!(fixture.state.rooms().get("m-1").is_none());
        assert_eq!(fixture.recorder.reports().len(), 2);
    }

    #[tokio::test]
    async fn bot_room_starts_with_one_human_and_answers() {
        let fixture = fixture(Duration::from_secs(60));
        let room = open(&fixture, Some(BotDifficulty::Difficult));

        let mut human = room.join().await.unwrap();
        assert_eq!(human.seat, Seat::First);
        assert!(matches!(room.join().await, Err(JoinError::RoomLocked)));

        play(&human, 0);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mirrored = mirror(&drain(&mut human.inbound));
        assert_eq!(mirrored.game_state, Phase::Playing);
        assert_eq!(mirrored.board.get(0), Some(Cell::X));
        assert_eq!(mirrored.board.get(4), Some(Cell::O));
        assert_eq!(mirrored.active_player, Seat::First);
    }

    #[tokio::test]
    async fn human_leaving_a_bot_room_closes_it() {
        let fixture = fixture(Duration::from_secs(60));
        let room = open(&fixture, Some(BotDifficulty::Normal));
        let human = room.join().await.unwrap();
        settle().await;

        drop(human);
        settle().await;

        assert!(room.is_closed());
        assert!(fixture.state.rooms().is_empty());
    }

    #[tokio::test]
    async fn leaving_before_the_match_starts_closes_silently() {
        let fixture = fixture(Duration::from_secs(60));
        let mut lobby = fixture.state.lobby().subscribe();
        let room = open(&fixture, None);
        let only = room.join().await.unwrap();
        settle().await;

        drop(only);
        settle().await;

        assert!(room.is_closed());
        assert!(fixture.state.rooms().is_empty());
        assert!(fixture.recorder.reports().is_empty());
        let mut events = Vec::new();
        while let Ok(event) = lobby.try_recv() {
            events.push(event.event);
        }
        assert_eq!(
            events.last().and_then(|name| name.as_deref()),
            Some(sse_events::EVENT_ROOM_DISPOSED)
        );
    }

    #[tokio::test]
    async fn unjoined_room_expires() {
        let fixture = fixture(Duration::from_millis(20));
        let mut lobby = fixture.state.lobby().subscribe();
        let room = open(&fixture, None);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(room.is_closed());
        assert!(fixture.state.rooms().is_empty());
        let event = lobby.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some(sse_events::EVENT_ROOM_DISPOSED));
    }

    #[tokio::test]
    async fn finish_request_closes_an_undecided_match() {
        let fixture = fixture(Duration::from_secs(60));
        let room = open(&fixture, None);
        let first = room.join().await.unwrap();
        let _second = room.join().await.unwrap();

        first.link.send(ClientMessage::FinishGame).unwrap();
        first.link.send(ClientMessage::FinishGame).unwrap();
        settle().await;

        assert_eq!(room.describe().await.unwrap().state.game_state, Phase::Finished);
        let reports = fixture.recorder.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].endpoint(), "match_aborted");
    }
}
