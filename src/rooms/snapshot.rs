//! Wire-facing DTOs derived from a `Room`: the canonical snapshot clients
//! consume, the progress sub-record, and small response shapes.

use super::model::{NarrationHandle, NarrationStatus, PlaybackState, PlayerId, Room, RoomState};
use crate::templates::SlotType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub is_host: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room_id: Uuid,
    pub room_code: String,
    pub round_id: Uuid,
    pub round_index: u64,
    pub state_version: u64,
    pub room_state: RoomState,
    pub locked: bool,
    pub template_id: Option<String>,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Progress {
    pub assigned_total: usize,
    pub submitted_total: usize,
    pub connected_total: usize,
    pub disconnected_total: usize,
    pub ready_to_reveal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptView {
    pub id: Uuid,
    pub slot_id: String,
    pub slot_type: SlotType,
    pub label: String,
    pub submitted: bool,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NarrationView {
    pub job_id: Uuid,
    pub status: NarrationStatus,
    pub audio_url: Option<String>,
    pub from_cache: bool,
    pub playback: PlaybackState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareView {
    pub share_token: String,
    pub share_url: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.room_id,
            room_code: room.room_code.clone(),
            round_id: room.round_id,
            round_index: room.round_index,
            state_version: room.state_version,
            room_state: room.state,
            locked: room.locked,
            template_id: room.template_id.clone(),
            players: room
                .players
                .iter()
                .filter(|p| !p.kicked)
                .map(|p| PlayerView {
                    id: p.id,
                    display_name: p.display_name.clone(),
                    is_host: p.is_host,
                    connected: p.connected,
                })
                .collect(),
        }
    }
}

impl From<&Room> for Progress {
    fn from(room: &Room) -> Self {
        let assigned_total = room.prompts.iter().filter(|p| p.assigned_player_id.is_some()).count();
        let submitted_total = room.prompts.iter().filter(|p| p.submitted).count();
        let connected_total = room.players.iter().filter(|p| p.connected && !p.kicked).count();
        let disconnected_total = room
            .players
            .iter()
            .filter(|p| !p.connected && !p.kicked)
            .count();
        // Open question resolved per the design spec: count submissions
        // regardless of current assignment.
        let ready_to_reveal = room.all_submitted();

        Self {
            assigned_total,
            submitted_total,
            connected_total,
            disconnected_total,
            ready_to_reveal,
        }
    }
}

impl From<&NarrationHandle> for NarrationView {
    fn from(handle: &NarrationHandle) -> Self {
        Self {
            job_id: handle.job_id,
            status: handle.status,
            audio_url: handle.audio_url.clone(),
            from_cache: handle.from_cache,
            playback: handle.playback,
        }
    }
}

pub fn prompts_for_player(room: &Room, player_id: PlayerId) -> Vec<PromptView> {
    room.prompts
        .iter()
        .filter(|p| p.assigned_player_id == Some(player_id))
        .map(|p| PromptView {
            id: p.id,
            slot_id: p.slot_id.clone(),
            slot_type: p.slot_type,
            label: p.label.clone(),
            submitted: p.submitted,
            value: p.value.clone(),
        })
        .collect()
}
