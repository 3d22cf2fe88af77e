//! Room lifecycle, prompt, and reveal endpoints.

use super::{bearer_token, enforce_rate_limit, AppState};
use crate::error::AppError;
use crate::narration::PlaybackAction;
use crate::rate_limit::Quota;
use crate::rooms::model::Room;
use crate::rooms::snapshot::{NarrationView, Progress, PromptView, RoomSnapshot};
use crate::rooms::{commands, RoomId};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

async fn room_handle(state: &AppState, code: &str) -> Result<Arc<Mutex<Room>>, AppError> {
    state
        .store
        .get_by_code(code)
        .ok_or_else(|| AppError::NotFound(format!("no room with code {code}")))
}

async fn publish(state: &AppState, room: &Room) {
    state.bus.publish_snapshot(room);
}

/// Round-scoped endpoints (`/rooms/{code}/rounds/{round_id}/...`) only ever
/// resolve against the room's *current* round. Once `replay` rotates
/// `round_id`, the previous round's path segment stops resolving, per the
/// design spec's note that a revealed story is not reachable via HTTP once
/// the round it belonged to has rotated out.
fn ensure_current_round(room: &Room, round_id: Uuid) -> Result<(), AppError> {
    if room.round_id == round_id {
        Ok(())
    } else {
        Err(AppError::NotFound("round not found".to_string()))
    }
}

/// Read-only endpoints must also surface `Expired` once a room has aged out,
/// rather than keep serving stale `revealed_story`/progress/narration off a
/// room that is only waiting on the sweeper's purge grace period.
fn ensure_not_expired(room: &Room) -> Result<(), AppError> {
    if room.state == crate::rooms::RoomState::Expired {
        Err(AppError::Expired)
    } else {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub room_code: String,
    pub room_id: RoomId,
    pub host_token: String,
    pub player_token: String,
    pub snapshot: RoomSnapshot,
}

pub async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    let client_ip = client_bucket(&headers);
    enforce_rate_limit(&state.rate_limiter, &format!("ip:{client_ip}:create_room"), Quota::per_minute(10))
        .await?;

    let (handle, host_token, player_token) = state.store.create_room(body.display_name)?;
    let room = handle.lock().await;
    let snapshot = RoomSnapshot::from(&*room);
    Ok(Json(CreateRoomResponse {
        room_code: room.room_code.clone(),
        room_id: room.room_id,
        host_token,
        player_token,
        snapshot,
    }))
}

fn client_bucket(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinRoomResponse {
    pub player_id: Uuid,
    pub player_token: String,
    pub snapshot: RoomSnapshot,
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(body): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, AppError> {
    let client_ip = client_bucket(&headers);
    enforce_rate_limit(&state.rate_limiter, &format!("ip:{client_ip}:join_room"), Quota::per_minute(30))
        .await?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    let (player_id, player_token) = commands::join(&mut room, &state.config, body.display_name)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(JoinRoomResponse {
        player_id,
        player_token,
        snapshot,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PlayerAuthRequest {
    pub player_id: Uuid,
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(body): Json<PlayerAuthRequest>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    commands::leave(&mut room, body.player_id, token)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(snapshot))
}

pub async fn lock_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RoomSnapshot>, AppError> {
    set_locked(state, code, headers, true).await
}

pub async fn unlock_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RoomSnapshot>, AppError> {
    set_locked(state, code, headers, false).await
}

async fn set_locked(
    state: AppState,
    code: String,
    headers: HeaderMap,
    locked: bool,
) -> Result<Json<RoomSnapshot>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    commands::set_locked(&mut room, token, locked)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct KickRequest {
    pub target_player_id: Uuid,
}

pub async fn kick_player(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(body): Json<KickRequest>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    commands::kick(&mut room, token, body.target_player_id)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct SetTemplateRequest {
    pub template_id: String,
}

pub async fn set_template(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SetTemplateRequest>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    commands::set_template(&mut room, token, &body.template_id)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(snapshot))
}

pub async fn start_round(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RoomSnapshot>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    commands::start(&mut room, token, &state.config)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct GetPromptsQuery {
    pub player_id: Uuid,
    pub player_token: String,
}

/// Documented as `GET .../prompts?player_id=&player_token=` (spec.md §6):
/// a GET has no body channel, so the player token travels in the query
/// string here rather than the `Authorization` header the other handlers use.
pub async fn get_prompts(
    State(state): State<AppState>,
    Path((code, round_id)): Path<(String, Uuid)>,
    axum::extract::Query(query): axum::extract::Query<GetPromptsQuery>,
) -> Result<Json<Vec<PromptView>>, AppError> {
    let handle = room_handle(&state, &code).await?;
    let room = handle.lock().await;
    ensure_current_round(&room, round_id)?;
    let player = room.player(query.player_id).ok_or(AppError::Auth)?;
    if !crate::ids::secrets_match(&player.token, &query.player_token) {
        return Err(AppError::Auth);
    }
    if room.state != crate::rooms::RoomState::Prompting {
        return Err(AppError::StateConflict("room is not accepting submissions".to_string()));
    }
    Ok(Json(crate::rooms::snapshot::prompts_for_player(&room, query.player_id)))
}

#[derive(Debug, Deserialize)]
pub struct SubmitPromptRequest {
    pub player_id: Uuid,
    pub value: String,
}

pub async fn submit_prompt(
    State(state): State<AppState>,
    Path((code, round_id, prompt_id)): Path<(String, Uuid, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<SubmitPromptRequest>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let token = bearer_token(&headers)?;
    let bucket = format!("room:{code}:player:{}:submit_prompt", body.player_id);
    enforce_rate_limit(&state.rate_limiter, &format!("{bucket}:1s"), Quota::per_second(1)).await?;
    enforce_rate_limit(&state.rate_limiter, &format!("{bucket}:60m"), Quota::per_minute(60)).await?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    ensure_current_round(&room, round_id)?;
    commands::submit_prompt(
        &mut room,
        body.player_id,
        token,
        prompt_id,
        &body.value,
        state.filter.as_ref(),
    )?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(snapshot))
}

#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub story: String,
    pub snapshot: RoomSnapshot,
}

pub async fn reveal_round(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RevealResponse>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    let story = commands::reveal(&mut room, token)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(RevealResponse { story, snapshot }))
}

pub async fn replay_round(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RoomSnapshot>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    commands::replay(&mut room, token, &state.config)?;
    let snapshot = RoomSnapshot::from(&*room);
    publish(&state, &room).await;
    Ok(Json(snapshot))
}

#[derive(Debug, Serialize)]
pub struct ReconnectResponse {
    pub snapshot: RoomSnapshot,
    pub prompts: Vec<PromptView>,
}

pub async fn reconnect_player(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(body): Json<PlayerAuthRequest>,
) -> Result<Json<ReconnectResponse>, AppError> {
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    let mut room = handle.lock().await;
    commands::reconnect(&mut room, body.player_id, token)?;
    let snapshot = RoomSnapshot::from(&*room);
    let prompts = crate::rooms::snapshot::prompts_for_player(&room, body.player_id);
    publish(&state, &room).await;
    Ok(Json(ReconnectResponse { snapshot, prompts }))
}

#[derive(Debug, Serialize)]
pub struct StoryResponse {
    pub story: Option<String>,
}

pub async fn get_story(
    State(state): State<AppState>,
    Path((code, round_id)): Path<(String, Uuid)>,
) -> Result<Json<StoryResponse>, AppError> {
    let handle = room_handle(&state, &code).await?;
    let room = handle.lock().await;
    ensure_current_round(&room, round_id)?;
    ensure_not_expired(&room)?;
    if room.revealed_story.is_none() {
        return Err(AppError::StateConflict("story has not been revealed yet".to_string()));
    }
    Ok(Json(StoryResponse {
        story: room.revealed_story.clone(),
    }))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path((code, round_id)): Path<(String, Uuid)>,
) -> Result<Json<Progress>, AppError> {
    let handle = room_handle(&state, &code).await?;
    let room = handle.lock().await;
    ensure_current_round(&room, round_id)?;
    ensure_not_expired(&room)?;
    Ok(Json(Progress::from(&*room)))
}

pub async fn request_narration(
    State(state): State<AppState>,
    Path((code, round_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<NarrationView>, AppError> {
    enforce_rate_limit(
        &state.rate_limiter,
        &format!("room:{code}:narration"),
        Quota::new(3, std::time::Duration::from_secs(10 * 60)),
    )
    .await?;
    let token = bearer_token(&headers)?;
    let handle = room_handle(&state, &code).await?;
    {
        let room = handle.lock().await;
        ensure_current_round(&room, round_id)?;
        if !room.is_host_token(token) {
            return Err(AppError::Auth);
        }
    }
    Ok(Json(state.narration.request(&code).await?))
}

pub async fn get_narration(
    State(state): State<AppState>,
    Path((code, round_id)): Path<(String, Uuid)>,
) -> Result<Json<NarrationView>, AppError> {
    let handle = room_handle(&state, &code).await?;
    {
        let room = handle.lock().await;
        ensure_current_round(&room, round_id)?;
        ensure_not_expired(&room)?;
    }
    Ok(Json(state.narration.get(&code).await?))
}

#[derive(Debug, Deserialize)]
pub struct PlaybackRequest {
    pub action: PlaybackAction,
}

pub async fn update_playback(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<PlaybackRequest>,
) -> Result<Json<NarrationView>, AppError> {
    Ok(Json(state.narration.update_playback(job_id, body.action).await?))
}
