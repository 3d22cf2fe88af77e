//! WebSocket upgrade endpoint: validates the room/player/token query params
//! before handing the socket off to the per-connection session loop.

use super::session;
use crate::http::AppState;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::SinkExt;
use serde::Deserialize;

/// Custom application close codes, layered on top of the reserved WebSocket
/// range (private use starts at 4000).
pub mod close_code {
    pub const BAD_REQUEST: u16 = 4400;
    pub const FORBIDDEN: u16 = 4403;
    pub const NOT_FOUND: u16 = 4404;
    pub const GONE: u16 = 4410;
    pub const TRY_AGAIN: u16 = 4429;
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub room_code: String,
    pub token: String,
}

async fn reject(mut socket: WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let Some(handle) = state.store.get_by_code(&params.room_code) else {
            reject(socket, close_code::NOT_FOUND, "room not found").await;
            return;
        };

        let auth_result = {
            let room = handle.lock().await;
            if room.state == crate::rooms::RoomState::Expired {
                Err((close_code::GONE, "room has expired"))
            } else {
                match room.player_by_token(&params.token) {
                    Some(player) => Ok(player.id),
                    None => Err((close_code::FORBIDDEN, "unknown token")),
                }
            }
        };

        match auth_result {
            Ok(player_id) => session::run(socket, state, handle, player_id).await,
            Err((code, reason)) => reject(socket, code, reason).await,
        }
    })
}
