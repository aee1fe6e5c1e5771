use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;

use crate::{services::sse_service, state::SharedState};

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/sse/rooms", get(rooms_stream))
}

#[utoipa::path(
    get,
    path = "/sse/rooms",
    tag = "sse",
    responses((status = 200, description = "Room listing SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream the live rooms, then their creation, update and disposal events.
pub async fn rooms_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse_service::lobby_stream(&state).await
}
