use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::ServerEvent,
    services::{room_service, sse_events},
    state::SharedState,
};

const FORWARD_BUFFER: usize = 8;
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Open a room listing stream: one `room.listed` event per live room, then every
/// lobby event broadcast afterwards.
pub async fn lobby_stream(
    state: &SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    // Subscribe before listing so no change between the two is lost.
    let receiver = state.lobby().subscribe();
    let catch_up: Vec<ServerEvent> = room_service::list_rooms(state)
        .await
        .into_iter()
        .filter_map(sse_events::room_listed_event)
        .collect();
    info!(rooms = catch_up.len(), "room SSE subscriber connected");
    to_sse_stream(catch_up, receiver)
}

/// Convert a broadcast receiver into an SSE response, sending `catch_up` first and
/// forwarding events until the client disconnects.
pub fn to_sse_stream(
    catch_up: Vec<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(FORWARD_BUFFER);

    tokio::spawn(async move {
        for payload in catch_up {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "room SSE subscriber lagged");
                        }
                    }
                }
            }
        }

        info!("room SSE stream disconnected");
    });

    // axum drops this stream when the client goes away, which closes the forwarder
    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
