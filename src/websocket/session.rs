//! Per-connection send/receive pump: forwards room events to the client,
//! answers heartbeats, and arms the disconnect-grace timer on drop.

use super::handler::close_code;
use crate::http::AppState;
use crate::rooms::model::{PlayerId, Room};
use crate::rooms::{assigner, RoomState};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub async fn run(socket: WebSocket, state: AppState, handle: Arc<Mutex<Room>>, player_id: PlayerId) {
    let room_id = {
        let mut room = handle.lock().await;
        if let Some(player) = room.player_mut(player_id) {
            player.connected = true;
            player.disconnected_at = None;
        }
        room.bump_version();
        state.bus.publish_snapshot(&room);
        room.room_id
    };

    let mut rx = state.bus.subscribe(room_id);
    let (mut sink, mut stream) = socket.split();

    {
        let room = handle.lock().await;
        let message = crate::bus::ServerMessage::snapshot_of(&room);
        if let Ok(text) = serde_json::to_string(&message) {
            let _ = sink.send(Message::Text(text.into())).await;
        }
    }

    let mut idle_ticker = tokio::time::interval(state.config.socket_idle_timeout() / 2);
    idle_ticker.tick().await; // consume the immediate first tick
    let mut last_activity = tokio::time::Instant::now();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                        last_activity = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        last_activity = tokio::time::Instant::now();
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        debug!(error = %err, "websocket read error");
                        break;
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(message) => {
                        if let Ok(text) = serde_json::to_string(&*message) {
                            if sink.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // The outbound buffer overflowed: this socket fell behind the
                        // room's event stream by `skipped` messages. Per the backpressure
                        // contract, a slow subscriber is disconnected rather than left to
                        // replay a stale snapshot.
                        warn!(room_id = %room_id, skipped, "session lagged behind room event stream, disconnecting");
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::TRY_AGAIN,
                                reason: "try again".into(),
                            })))
                            .await;
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = idle_ticker.tick() => {
                if last_activity.elapsed() >= state.config.socket_idle_timeout() {
                    debug!(room_id = %room_id, "closing idle websocket connection");
                    break;
                }
            }
        }
    }

    on_disconnect(state, handle, player_id).await;
}

async fn on_disconnect(state: AppState, handle: Arc<Mutex<Room>>, player_id: PlayerId) {
    let disconnected_at = {
        let mut room = handle.lock().await;
        let now = Utc::now();
        if let Some(player) = room.player_mut(player_id) {
            player.connected = false;
            player.disconnected_at = Some(now);
        }
        room.bump_version();
        state.bus.publish_snapshot(&room);
        now
    };

    let grace = state.config.disconnect_grace();
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        let mut room = handle.lock().await;
        let still_disconnected = room
            .player(player_id)
            .map(|p| !p.connected && p.disconnected_at == Some(disconnected_at))
            .unwrap_or(false);
        if still_disconnected && room.state == RoomState::Prompting {
            assigner::reassign_from(&mut room, player_id);
            room.bump_version();
            state.bus.publish_snapshot(&room);
        }
    });
}
