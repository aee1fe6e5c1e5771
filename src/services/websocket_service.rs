use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    client::connector::{LocalConnector, RetryPolicy, join_with_retry},
    dto::ws::{ClientMessage, RoomMessage},
    state::SharedState,
};

/// Handle the full lifecycle of one room client WebSocket connection.
///
/// The socket joins the room serving `match_id`, forwards every room message as a JSON
/// text frame and relays inbound selections. Closing the socket releases the seat.
pub async fn handle_socket(state: SharedState, match_id: String, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connector = LocalConnector::new(state.clone());
    let policy = RetryPolicy::from(state.config().join);
    let connection = match join_with_retry(&connector, &match_id, policy).await {
        Ok(connection) => connection,
        Err(err) => {
            warn!(match_id = %match_id, error = %err, "websocket could not join room");
            let _ = outbound_tx.send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: err.to_string().into(),
            })));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let seat = connection.seat;
    let link = connection.link;
    let mut inbound = connection.inbound;
    info!(match_id = %match_id, ?seat, "room client connected");

    // Room messages are forwarded in the order the room produced them.
    let room_tx = outbound_tx.clone();
    let forward_task = tokio::spawn(async move {
        while let Some(message) = inbound.recv().await {
            if send_message_to_websocket(&room_tx, &message).is_err() {
                break;
            }
        }
        let _ = room_tx.send(Message::Close(None));
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientMessage::from_json_str(&text) {
                Ok(message) => {
                    debug!(match_id = %match_id, ?seat, ?message, "room client message");
                    if link.send(message).is_err() {
                        info!(match_id = %match_id, ?seat, "room closed; dropping connection");
                        break;
                    }
                }
                Err(err) => {
                    warn!(match_id = %match_id, ?seat, error = %err, "failed to parse or validate room client message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(match_id = %match_id, ?seat, "room client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(match_id = %match_id, ?seat, error = %err, "websocket error");
                break;
            }
        }
    }

    drop(link);
    forward_task.abort();
    info!(match_id = %match_id, ?seat, "room client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a room message and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; a closed writer is reported.
pub fn send_message_to_websocket(
    tx: &mpsc::UnboundedSender<Message>,
    message: &RoomMessage,
) -> Result<(), mpsc::error::SendError<Message>> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize room message `{message:?}`");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into()))
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
