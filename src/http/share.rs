//! Read-only share links for a revealed story.

use super::{bearer_token, AppState};
use crate::error::AppError;
use crate::rooms::commands;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub share_token: String,
    pub share_url: String,
    pub expires_at: DateTime<Utc>,
}

fn share_url(share_token: &str) -> String {
    format!("https://storyfill.example/share/{share_token}")
}

pub async fn create_share(
    State(state): State<AppState>,
    Path((code, round_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<ShareResponse>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = state
        .store
        .get_by_code(&code)
        .ok_or_else(|| AppError::NotFound(format!("no room with code {code}")))?;
    let mut room = handle.lock().await;
    if room.round_id != round_id {
        return Err(AppError::NotFound("round not found".to_string()));
    }
    let artifact = commands::create_share(&mut room, token, &state.config)?;
    state.store.register_share(artifact.share_token.clone(), room.room_id);
    state.bus.publish_snapshot(&room);
    Ok(Json(ShareResponse {
        share_url: share_url(&artifact.share_token),
        share_token: artifact.share_token,
        expires_at: artifact.expires_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct SharedStoryResponse {
    pub rendered_story: String,
    pub expires_at: DateTime<Utc>,
    pub room_code: String,
    pub round_id: Uuid,
}

pub async fn get_share(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
) -> Result<Json<SharedStoryResponse>, AppError> {
    let handle = state
        .store
        .get_by_share_token(&share_token)
        .ok_or_else(|| AppError::NotFound("share link not found".to_string()))?;
    let room = handle.lock().await;
    let artifact = room
        .share
        .as_ref()
        .filter(|artifact| artifact.share_token == share_token)
        .ok_or_else(|| AppError::NotFound("share link not found".to_string()))?;

    if artifact.expires_at <= Utc::now() {
        return Err(AppError::Expired);
    }

    Ok(Json(SharedStoryResponse {
        rendered_story: artifact.rendered_story.clone(),
        expires_at: artifact.expires_at,
        room_code: artifact.room_code.clone(),
        round_id: artifact.round_id,
    }))
}
