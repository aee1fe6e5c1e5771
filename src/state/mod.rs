pub mod board;
pub mod context;
mod lobby;
pub mod pipeline;
pub mod registry;
pub mod room;
pub mod state_machine;
pub mod sync;

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::AppConfig,
    services::notifier::{DisabledNotifier, MatchNotifier, WebhookNotifier},
};

pub use self::lobby::SseHub;
use self::registry::RoomRegistry;

pub type SharedState = Arc<AppState>;

const LOBBY_CAPACITY: usize = 64;

/// Central application state: configuration, live rooms, the listing stream and the
/// match lifecycle reporter.
pub struct AppState {
    config: Arc<AppConfig>,
    rooms: RoomRegistry,
    lobby: SseHub,
    notifier: Arc<dyn MatchNotifier>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Match reporting goes to the configured webhook, or nowhere when none is set.
    pub fn new(config: AppConfig) -> SharedState {
        let notifier: Arc<dyn MatchNotifier> = match WebhookNotifier::from_config(&config.webhook) {
            Some(Ok(webhook)) => {
                info!(base_url = %webhook.base_url(), "match webhook enabled");
                Arc::new(webhook)
            }
            Some(Err(err)) => {
                warn!(error = %err, "failed to build webhook client; reporting disabled");
                Arc::new(DisabledNotifier)
            }
            None => {
                info!("no match webhook configured; reporting disabled");
                Arc::new(DisabledNotifier)
            }
        };
        Self::with_notifier(config, notifier)
    }

    /// Construct the state around an explicit reporter.
    pub fn with_notifier(config: AppConfig, notifier: Arc<dyn MatchNotifier>) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            rooms: RoomRegistry::new(),
            lobby: SseHub::new(LOBBY_CAPACITY),
            notifier,
        })
    }

    /// Access the immutable application configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Registry of live rooms keyed by match id.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Broadcast hub used for the room listing SSE stream.
    pub fn lobby(&self) -> &SseHub {
        &self.lobby
    }

    /// Reporter for match lifecycle events.
    pub fn notifier(&self) -> Arc<dyn MatchNotifier> {
        self.notifier.clone()
    }
}
