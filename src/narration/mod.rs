//! Narration orchestration: request/poll/playback for the simulated
//! text-to-speech job that reads a revealed story aloud.
//!
//! Generation itself is stubbed (there is no real external provider wired
//! up), but the job lifecycle, at-most-one-active-job-per-round rule, and
//! fingerprint-keyed cache are real, mirroring the teacher's pattern of a
//! background `tokio::spawn`ed worker reporting back into shared state
//! through the same lock the request path uses.

use crate::bus::EventBus;
use crate::error::AppError;
use crate::rooms::model::{NarrationHandle, NarrationStatus, PlaybackState, Room, RoomId, RoomState};
use crate::rooms::snapshot::NarrationView;
use crate::rooms::RoomStore;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackAction {
    Play,
    Pause,
    Stop,
    Complete,
}

fn fingerprint(story: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    story.hash(&mut hasher);
    hasher.finish()
}

fn simulated_audio_url(job_id: Uuid) -> String {
    format!("https://narration.storyfill.example/audio/{job_id}.mp3")
}

pub struct NarrationService {
    store: Arc<RoomStore>,
    bus: Arc<EventBus>,
    /// job_id -> room_id, so a poll by job id alone doesn't need the caller
    /// to also supply a room code.
    jobs: DashMap<Uuid, RoomId>,
}

impl NarrationService {
    pub fn new(store: Arc<RoomStore>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            jobs: DashMap::new(),
        }
    }

    fn room_handle(&self, room_code: &str) -> Result<Arc<Mutex<Room>>, AppError> {
        self.store
            .get_by_code(room_code)
            .ok_or_else(|| AppError::NotFound("room not found".to_string()))
    }

    async fn publish(&self, handle: &Arc<Mutex<Room>>) {
        let room = handle.lock().await;
        self.bus.publish_snapshot(&room);
    }

    /// Request narration for the currently revealed story. Idempotent: a
    /// second call while a job is active, or once it's ready, returns the
    /// existing handle rather than starting a second job for the same round.
    pub async fn request(&self, room_code: &str) -> Result<NarrationView, AppError> {
        let handle = self.room_handle(room_code)?;
        let mut spawn_job_id = None;
        let mut new_job_id = None;

        let view = {
            let mut room = handle.lock().await;
            if room.state != RoomState::Revealed {
                return Err(AppError::StateConflict(
                    "narration is only available once the story has been revealed".to_string(),
                ));
            }

            let round_id = room.round_id;
            if let Some(existing) = &room.narration {
                if existing.round_id == round_id {
                    return Ok(NarrationView::from(existing));
                }
            }

            let story = room.revealed_story.clone().unwrap_or_default();
            let fp = fingerprint(&story);

            let handle_value = if let Some(cached) = room.narration_cache.get(&fp).cloned() {
                let job_id = Uuid::new_v4();
                new_job_id = Some(job_id);
                NarrationHandle {
                    job_id,
                    room_id: room.room_id,
                    round_id,
                    status: NarrationStatus::FromCache,
                    audio_url: cached.audio_url,
                    from_cache: true,
                    playback: PlaybackState::Stopped,
                }
            } else {
                let job_id = Uuid::new_v4();
                new_job_id = Some(job_id);
                spawn_job_id = Some(job_id);
                NarrationHandle {
                    job_id,
                    room_id: room.room_id,
                    round_id,
                    status: NarrationStatus::Requesting,
                    audio_url: None,
                    from_cache: false,
                    playback: PlaybackState::Stopped,
                }
            };

            room.narration = Some(handle_value.clone());
            room.bump_version();
            NarrationView::from(&handle_value)
        };

        if let Some(job_id) = new_job_id {
            self.jobs.insert(job_id, view_room_id(&handle).await);
        }
        if let Some(job_id) = spawn_job_id {
            self.spawn_job(handle.clone(), job_id);
        }

        self.publish(&handle).await;
        Ok(view)
    }

    fn spawn_job(&self, handle: Arc<Mutex<Room>>, job_id: Uuid) {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;

            let mut room = handle.lock().await;
            let still_current = matches!(&room.narration, Some(n) if n.job_id == job_id);
            if still_current {
                let audio_url = simulated_audio_url(job_id);
                if let Some(narration) = room.narration.as_mut() {
                    narration.status = NarrationStatus::Ready;
                    narration.audio_url = Some(audio_url);
                }
                let fp = fingerprint(&room.revealed_story.clone().unwrap_or_default());
                let cached_value = room.narration.clone().expect("checked above");
                room.narration_cache.insert(fp, cached_value);
                room.bump_version();
            }
            bus.publish_snapshot(&room);
        });
    }

    pub async fn get(&self, room_code: &str) -> Result<NarrationView, AppError> {
        let handle = self.room_handle(room_code)?;
        let room = handle.lock().await;
        room.narration
            .as_ref()
            .map(NarrationView::from)
            .ok_or_else(|| AppError::NotFound("no narration has been requested for this round".to_string()))
    }

    /// Update advisory playback state for the job identified by `job_id`
    /// alone, per the narration collaborator facade's `updatePlayback`
    /// contract. Purely informational: it never touches audio generation.
    pub async fn update_playback(&self, job_id: Uuid, action: PlaybackAction) -> Result<NarrationView, AppError> {
        let room_id = *self
            .jobs
            .get(&job_id)
            .ok_or_else(|| AppError::NotFound("unknown narration job".to_string()))?;
        let handle = self
            .store
            .get_by_id(room_id)
            .ok_or_else(|| AppError::NotFound("unknown narration job".to_string()))?;

        let view = {
            let mut room = handle.lock().await;
            let narration = room
                .narration
                .as_mut()
                .filter(|n| n.job_id == job_id)
                .ok_or_else(|| AppError::NotFound("unknown narration job".to_string()))?;

            if !matches!(narration.status, NarrationStatus::Ready | NarrationStatus::FromCache) {
                return Err(AppError::StateConflict(
                    "narration audio is not ready yet".to_string(),
                ));
            }

            narration.playback = match action {
                PlaybackAction::Play => PlaybackState::Playing,
                PlaybackAction::Pause => PlaybackState::Paused,
                PlaybackAction::Stop => PlaybackState::Stopped,
                PlaybackAction::Complete => PlaybackState::Completed,
            };
            room.bump_version();
            NarrationView::from(room.narration.as_ref().expect("checked above"))
        };
        self.publish(&handle).await;
        Ok(view)
    }
}

async fn view_room_id(handle: &Arc<Mutex<Room>>) -> RoomId {
    handle.lock().await.room_id
}
