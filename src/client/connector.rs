//! Joining a room: the transport seam between a client session and its room.

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    config::JoinConfig,
    dto::ws::ClientMessage,
    error::JoinError,
    state::{SharedState, room::Seat, sync::ObserverRx},
};

/// The room behind a link stopped accepting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("room link closed")]
pub struct LinkClosed;

/// Outbound half of a joined seat.
pub trait RoomLink: Send + Sync {
    /// Queue a message for the room.
    fn send(&self, message: ClientMessage) -> Result<(), LinkClosed>;
}

/// A seat admitted into a room.
pub struct Connection {
    /// Seat granted by the room.
    pub seat: Seat,
    /// Ordered room messages for this seat, starting with its index and a snapshot.
    pub inbound: ObserverRx,
    /// Channel back to the room. Dropping it releases the seat.
    pub link: Box<dyn RoomLink>,
}

/// Something that can admit a client into the room serving a match.
pub trait RoomConnector: Send + Sync {
    fn connect(&self, match_id: &str) -> BoxFuture<'static, Result<Connection, JoinError>>;
}

/// Joins rooms hosted by this process.
#[derive(Clone)]
pub struct LocalConnector {
    state: SharedState,
}

impl LocalConnector {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl RoomConnector for LocalConnector {
    fn connect(&self, match_id: &str) -> BoxFuture<'static, Result<Connection, JoinError>> {
        let handle = self.state.rooms().get(match_id);
        let match_id = match_id.to_string();
        Box::pin(async move {
            let handle = handle.ok_or(JoinError::NotFound(match_id))?;
            handle.join().await
        })
    }
}

/// Bounded retry for the initial join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl From<JoinConfig> for RetryPolicy {
    fn from(value: JoinConfig) -> Self {
        Self {
            max_attempts: value.max_attempts,
            backoff: value.backoff,
        }
    }
}

/// Join `match_id`, retrying transient failures up to `policy.max_attempts` times.
///
/// A full or locked room is not retried.
pub async fn join_with_retry(
    connector: &dyn RoomConnector,
    match_id: &str,
    policy: RetryPolicy,
) -> Result<Connection, JoinError> {
    let mut attempt = 1;
    loop {
        match connector.connect(match_id).await {
            Ok(connection) => {
                info!(match_id, attempt, seat = ?connection.seat, "joined room");
                return Ok(connection);
            }
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                warn!(match_id, attempt, error = %err, "join failed; retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => {
                error!(match_id, attempt, error = %err, "giving up on joining room");
                return Err(err);
            }
        }
    }
}
