//! Core room data model: `Room`, `Player`, `Prompt`, and the small value
//! types that hang off a room (narration handle, share artifact).
//!
//! `Room` owns its players as an ordered collection keyed by id; lookups that
//! need to go the other way use `(room_id, player_id)` pairs rather than
//! back-pointers, per the design spec's note on avoiding cyclic references.

use crate::templates::SlotType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;
pub type RoundId = Uuid;
pub type PromptId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    LobbyOpen,
    Prompting,
    AwaitingReveal,
    Revealed,
    Expired,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub token: String,
    pub is_host: bool,
    pub connected: bool,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
    pub kicked: bool,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub id: PromptId,
    pub slot_id: String,
    pub slot_type: SlotType,
    pub label: String,
    pub assigned_player_id: Option<PlayerId>,
    pub submitted: bool,
    pub value: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub last_reassigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NarrationStatus {
    Idle,
    Requesting,
    Queued,
    Generating,
    Ready,
    FromCache,
    Blocked,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
    Completed,
}

#[derive(Debug, Clone)]
pub struct NarrationHandle {
    pub job_id: Uuid,
    pub room_id: RoomId,
    pub round_id: RoundId,
    pub status: NarrationStatus,
    pub audio_url: Option<String>,
    pub from_cache: bool,
    pub playback: PlaybackState,
}

#[derive(Debug, Clone)]
pub struct ShareArtifact {
    pub share_token: String,
    pub room_code: String,
    pub round_id: RoundId,
    pub rendered_story: String,
    pub expires_at: DateTime<Utc>,
}

/// The most recent revealed round, retained for `getStory` reachability
/// until the round rotates again via `replay`.
#[derive(Debug, Clone)]
pub struct RevealedRound {
    pub round_id: RoundId,
    pub template_id: String,
    pub story: String,
}

pub struct Room {
    pub room_id: RoomId,
    pub room_code: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,

    pub state: RoomState,
    pub locked: bool,
    pub template_id: Option<String>,
    pub round_index: u64,
    pub round_id: RoundId,
    pub state_version: u64,

    pub host_token: String,
    pub host_player_id: PlayerId,

    /// Ordered by join order; small enough (<= MAX_PLAYERS_PER_ROOM) that a
    /// `Vec` scan beats the bookkeeping of a separate insertion-order index.
    pub players: Vec<Player>,
    pub prompts: Vec<Prompt>,

    pub revealed_story: Option<String>,
    pub previous_revealed: Option<RevealedRound>,

    pub narration: Option<NarrationHandle>,
    pub narration_cache: std::collections::HashMap<u64, NarrationHandle>,
    pub share: Option<ShareArtifact>,
}

impl Room {
    pub fn new(room_id: RoomId, room_code: String, host_player_id: PlayerId, host_token: String) -> Self {
        let now = Utc::now();
        Self {
            room_id,
            room_code,
            created_at: now,
            last_activity_at: now,
            state: RoomState::LobbyOpen,
            locked: false,
            template_id: None,
            round_index: 0,
            round_id: crate::ids::new_round_id(),
            state_version: 0,
            host_token,
            host_player_id,
            players: Vec::new(),
            prompts: Vec::new(),
            revealed_story: None,
            previous_revealed: None,
            narration: None,
            narration_cache: std::collections::HashMap::new(),
            share: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    pub fn bump_version(&mut self) {
        self.state_version += 1;
        self.touch();
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn player_by_token(&self, token: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| crate::ids::secrets_match(&p.token, token))
    }

    pub fn prompt(&self, id: PromptId) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn prompt_mut(&mut self, id: PromptId) -> Option<&mut Prompt> {
        self.prompts.iter_mut().find(|p| p.id == id)
    }

    pub fn is_host_token(&self, token: &str) -> bool {
        crate::ids::secrets_match(&self.host_token, token)
    }

    pub fn connected_player_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.connected && !p.kicked)
            .map(|p| p.id)
            .collect()
    }

    pub fn prompts_held_by(&self, player_id: PlayerId) -> usize {
        self.prompts
            .iter()
            .filter(|p| p.assigned_player_id == Some(player_id))
            .count()
    }

    pub fn all_submitted(&self) -> bool {
        !self.prompts.is_empty() && self.prompts.iter().all(|p| p.submitted)
    }
}
