use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload carrying the live room count.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.rooms().handles().len();
    debug!(rooms, "health check");
    HealthResponse::ok(rooms)
}
