//! Concurrent room storage: one exclusive lock per room, no global lock.
//!
//! Mirrors the teacher's `DashMap`-backed connection registry, but wraps
//! each value in a `tokio::sync::Mutex<Room>` so a long-held room lock never
//! blocks unrelated rooms from being read or written concurrently.

use super::model::{Room, RoomId, RoomState};
use crate::bus::EventBus;
use crate::config::Config;
use crate::error::AppError;
use crate::ids;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct RoomStore {
    rooms: DashMap<RoomId, Arc<Mutex<Room>>>,
    codes: DashMap<String, RoomId>,
    shares: DashMap<String, RoomId>,
    config: Config,
}

impl RoomStore {
    pub fn new(config: Config) -> Self {
        Self {
            rooms: DashMap::new(),
            codes: DashMap::new(),
            shares: DashMap::new(),
            config,
        }
    }

    /// Allocate a fresh room with a unique code, retrying collisions up to
    /// `max_code_generation_attempts` times before giving up.
    pub fn create_room(
        &self,
        host_display_name: Option<String>,
    ) -> Result<(Arc<Mutex<Room>>, String, String), AppError> {
        for _ in 0..self.config.max_code_generation_attempts {
            let room_code = ids::generate_room_code();
            if self.codes.contains_key(&room_code) {
                continue;
            }

            let room_id = ids::new_room_id();
            let (room, host_token, player_token) =
                super::commands::new_room(room_id, room_code.clone(), host_display_name.clone());

            self.codes.insert(room_code.clone(), room_id);
            let handle = Arc::new(Mutex::new(room));
            self.rooms.insert(room_id, handle.clone());

            return Ok((handle, host_token, player_token));
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "exhausted room code generation attempts"
        )))
    }

    pub fn get_by_code(&self, room_code: &str) -> Option<Arc<Mutex<Room>>> {
        let room_id = *self.codes.get(room_code)?;
        self.rooms.get(&room_id).map(|entry| entry.clone())
    }

    pub fn get_by_id(&self, room_id: RoomId) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(&room_id).map(|entry| entry.clone())
    }

    /// Remember that `share_token` resolves to `room_id`, so `getShare` can
    /// look a room up without the caller also supplying its room code.
    pub fn register_share(&self, share_token: String, room_id: RoomId) {
        self.shares.insert(share_token, room_id);
    }

    pub fn get_by_share_token(&self, share_token: &str) -> Option<Arc<Mutex<Room>>> {
        let room_id = *self.shares.get(share_token)?;
        self.rooms.get(&room_id).map(|entry| entry.clone())
    }

    fn remove(&self, room_id: RoomId, room_code: &str) {
        self.rooms.remove(&room_id);
        self.codes.remove(room_code);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Periodically expire rooms that have been idle past `room_ttl`, publish
    /// one final `room.expired` event, then drop them after `sweep_grace`.
    pub async fn run_sweeper(self: Arc<Self>, bus: Arc<EventBus>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval());
        loop {
            ticker.tick().await;
            self.sweep_once(&bus).await;
        }
    }

    async fn sweep_once(&self, bus: &EventBus) {
        let now = chrono::Utc::now();
        let room_ttl = self.config.room_ttl();
        let sweep_grace = self.config.sweep_grace();

        let candidates: Vec<Arc<Mutex<Room>>> =
            self.rooms.iter().map(|entry| entry.value().clone()).collect();

        for handle in candidates {
            let mut room = handle.lock().await;
            let idle_for = now.signed_duration_since(room.last_activity_at);

            if room.state == RoomState::Expired {
                let expired_for = now.signed_duration_since(room.last_activity_at);
                if expired_for
                    .to_std()
                    .map(|d| d >= sweep_grace)
                    .unwrap_or(false)
                {
                    let room_id = room.room_id;
                    let room_code = room.room_code.clone();
                    drop(room);
                    self.remove(room_id, &room_code);
                    bus.remove(room_id);
                    info!(room_code = %room_code, "room removed after expiry grace period");
                }
                continue;
            }

            let is_idle_too_long = idle_for
                .to_std()
                .map(|d| d >= room_ttl)
                .unwrap_or(false);
            if is_idle_too_long {
                room.state = RoomState::Expired;
                room.bump_version();
                warn!(room_code = %room.room_code, "room expired due to inactivity");
                bus.publish_expired(&room);
            }
        }
    }
}

/// How long to wait, relative to "now", before treating a disconnected
/// player's grace period as elapsed. Exposed for the websocket layer's timer.
pub fn disconnect_grace(config: &Config) -> Duration {
    config.disconnect_grace()
}
