use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{
    ClientMessage, ErrorCode, EventFrame, GamePhase, ServerMessage,
};
use crate::room::{ConnectRole, RoomHandle};
use crate::server::GameServer;

use super::routes::WsParams;

/// Pings a connection may leave unanswered before it is dropped.
const MAX_MISSED_PONGS: u32 = 2;

/// Drives one WebSocket connection: decodes inbound frames into room
/// commands, drains the room's bounded outbound queue onto the socket,
/// and enforces the ping/pong heartbeat.
pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<GameServer>,
    room: Option<RoomHandle>,
    room_code: String,
    client_label: String,
    params: WsParams,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let Some(room) = room else {
        tracing::info!(%room_code, %client_label, "connection to unknown room rejected");
        let _ = send_rejection(&mut ws_sender, ErrorCode::RoomNotFound).await;
        let _ = ws_sender.close().await;
        return;
    };

    let role = if params.organizer {
        let Some(token) = params.token else {
            tracing::warn!(%room_code, %client_label, "organizer connect without token");
            let _ = send_rejection(&mut ws_sender, ErrorCode::Unauthorized).await;
            let _ = ws_sender.close().await;
            return;
        };
        ConnectRole::Organizer { token }
    } else if params.spectator {
        ConnectRole::Spectator
    } else {
        ConnectRole::Player
    };

    let conn_id = Uuid::new_v4();
    let config = server.adapter_config();
    let (tx, mut rx) = mpsc::channel::<Arc<EventFrame>>(config.outbound_queue_size);

    if let Err(err) = room
        .connect(conn_id, client_label.clone(), role, tx)
        .await
    {
        tracing::info!(
            %room_code,
            %client_label,
            error = %err,
            "connection rejected by room"
        );
        let _ = send_rejection(&mut ws_sender, err.error_code()).await;
        let _ = ws_sender.close().await;
        return;
    }

    tracing::info!(%room_code, conn = %conn_id, %client_label, "connection attached");

    // Pong bookkeeping is shared between the writer (sends pings, counts
    // strikes) and the reader (observes pongs, clears strikes).
    let missed_pongs = Arc::new(AtomicU32::new(0));

    // Writer: drains the bounded queue and owns the socket's send half.
    // When the room drops the subscriber the channel yields `None` and the
    // socket is closed after the queued frames have flushed.
    let heartbeat_interval = config.heartbeat_interval;
    let writer_missed = Arc::clone(&missed_pongs);
    let writer_room_code = room_code.clone();
    let mut writer = tokio::spawn(async move {
        let mut ping_timer = tokio::time::interval(heartbeat_interval);
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ping_timer.tick().await; // first tick is immediate

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&*frame) {
                        Ok(text) => text,
                        Err(err) => {
                            tracing::error!(room_code = %writer_room_code, error = %err, "event serialization failed");
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_timer.tick() => {
                    if writer_missed.fetch_add(1, Ordering::Relaxed) >= MAX_MISSED_PONGS {
                        tracing::info!(room_code = %writer_room_code, "heartbeat lost; dropping connection");
                        break;
                    }
                    if ws_sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    // Reader: runs in this task, decoding frames into room commands.
    let max_frame_bytes = config.max_frame_bytes;
    let reader_room = room.clone();
    let reader_missed = Arc::clone(&missed_pongs);
    let mut reader = tokio::spawn(async move {
        while let Some(message) = ws_receiver.next().await {
            let message = match message {
                Ok(message) => message,
                Err(err) => {
                    tracing::debug!(conn = %conn_id, error = %err, "websocket read error");
                    break;
                }
            };

            match message {
                Message::Text(text) => {
                    if text.len() > max_frame_bytes {
                        reader_room
                            .malformed(
                                conn_id,
                                ErrorCode::FrameTooLarge,
                                format!("{} bytes (max {})", text.len(), max_frame_bytes),
                            )
                            .await;
                        continue;
                    }
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_message) => {
                            reader_room.client_message(conn_id, client_message).await;
                        }
                        Err(err) => {
                            reader_room
                                .malformed(conn_id, ErrorCode::MalformedFrame, err.to_string())
                                .await;
                        }
                    }
                }
                Message::Binary(_) => {
                    reader_room
                        .malformed(
                            conn_id,
                            ErrorCode::MalformedFrame,
                            "binary frames are not part of the protocol".to_string(),
                        )
                        .await;
                }
                Message::Pong(_) => {
                    reader_missed.store(0, Ordering::Relaxed);
                }
                Message::Ping(_) => {
                    // Protocol-level pong is produced by the ws layer.
                }
                Message::Close(_) => break,
            }
        }
    });

    // Whichever half finishes first takes the whole connection down.
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    room.disconnected(conn_id).await;
    tracing::info!(%room_code, conn = %conn_id, "connection detached");
}

/// Sends a terminal error frame to a connection that never got attached
/// to a room. The phase is stamped `CLOSED`: whatever the room's internal
/// state, it was never open to this connection.
async fn send_rejection(
    sender: &mut SplitSink<WebSocket, Message>,
    code: ErrorCode,
) -> Result<(), axum::Error> {
    let frame = EventFrame::new(GamePhase::Closed, ServerMessage::error(code));
    let text = serde_json::to_string(&frame).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}
