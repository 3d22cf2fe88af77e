//! HTTP command surface: axum router, shared application state, and small
//! auth/rate-limit helpers reused by every handler module.

pub mod rooms;
pub mod share;
pub mod templates;

use crate::bus::EventBus;
use crate::config::Config;
use crate::error::AppError;
use crate::moderation::ContentFilter;
use crate::narration::NarrationService;
use crate::rate_limit::{Quota, RateLimiter};
use crate::rooms::RoomStore;
use axum::extract::FromRef;
use axum::http::{HeaderMap, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RoomStore>,
    pub bus: Arc<EventBus>,
    pub narration: Arc<NarrationService>,
    pub filter: Arc<dyn ContentFilter>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}

impl FromRef<AppState> for Arc<RoomStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = if state.config.cors_origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    };

    let v1 = Router::new()
        .route("/ws", get(crate::websocket::ws_upgrade))
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/{code}/join", post(rooms::join_room))
        .route("/rooms/{code}/leave", post(rooms::leave_room))
        .route("/rooms/{code}/lock", post(rooms::lock_room))
        .route("/rooms/{code}/unlock", post(rooms::unlock_room))
        .route("/rooms/{code}/kick", post(rooms::kick_player))
        .route("/rooms/{code}/template", post(rooms::set_template))
        .route("/rooms/{code}/start", post(rooms::start_round))
        .route(
            "/rooms/{code}/rounds/{round_id}/prompts",
            get(rooms::get_prompts),
        )
        .route(
            "/rooms/{code}/rounds/{round_id}/prompts/{prompt_id}",
            post(rooms::submit_prompt),
        )
        .route("/rooms/{code}/reveal", post(rooms::reveal_round))
        .route("/rooms/{code}/replay", post(rooms::replay_round))
        .route("/rooms/{code}/reconnect", post(rooms::reconnect_player))
        .route(
            "/rooms/{code}/rounds/{round_id}/story",
            get(rooms::get_story),
        )
        .route(
            "/rooms/{code}/rounds/{round_id}/progress",
            get(rooms::get_progress),
        )
        .route(
            "/rooms/{code}/rounds/{round_id}/narration",
            get(rooms::get_narration).post(rooms::request_narration),
        )
        .route(
            "/rooms/{code}/rounds/{round_id}/share",
            post(share::create_share),
        )
        .route("/share/{share_token}", get(share::get_share))
        .route("/tts/jobs/{job_id}/playback", post(rooms::update_playback))
        .route("/templates", get(templates::list_templates))
        .route("/templates/{template_id}", get(templates::get_template))
        .with_state(state);

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Extract a bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Auth)?;
    raw.strip_prefix("Bearer ").ok_or(AppError::Auth)
}

/// Check a per-bucket quota, translating a violation into the uniform
/// rate-limited error response.
pub async fn enforce_rate_limit(
    limiter: &RateLimiter,
    bucket: &str,
    quota: Quota,
) -> Result<(), AppError> {
    limiter
        .check(bucket, quota)
        .await
        .map_err(|exceeded| AppError::RateLimited {
            retry_after_secs: exceeded.retry_after.as_secs().max(1),
        })
}
