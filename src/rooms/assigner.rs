//! Prompt assignment: the initial deal on `start`/`replay`, and the
//! disconnect-driven reassignment policy.

use super::model::{PlayerId, Prompt, Room};
use crate::templates::Template;
use chrono::Utc;
use uuid::Uuid;

/// Build and deal a fresh round of prompts.
///
/// The flat prompt list has length `max(slots.len(), prompts_per_player *
/// player_count)`, built by repeating the template's slot list cyclically,
/// then dealt round-robin starting at `round_index mod player_count` so the
/// same player doesn't always draw the same slot types across rounds.
pub fn deal(template: &Template, room: &mut Room, prompts_per_player: u8) {
    let player_count = room.players.len();
    debug_assert!(player_count > 0, "deal requires at least one player");

    let target_len = std::cmp::max(
        template.slots.len(),
        prompts_per_player as usize * player_count,
    );

    let now = Utc::now();
    let mut prompts = Vec::with_capacity(target_len);
    for i in 0..target_len {
        let slot = &template.slots[i % template.slots.len()];
        prompts.push(Prompt {
            id: crate::ids::new_prompt_id(),
            slot_id: slot.id.clone(),
            slot_type: slot.slot_type,
            label: slot.label.clone(),
            assigned_player_id: None,
            submitted: false,
            value: None,
            assigned_at: now,
            submitted_at: None,
            last_reassigned_at: None,
        });
    }

    let start = (room.round_index as usize) % player_count;
    for (i, prompt) in prompts.iter_mut().enumerate() {
        let player_idx = (start + i) % player_count;
        prompt.assigned_player_id = Some(room.players[player_idx].id);
    }

    room.prompts = prompts;
}

/// Redeal a disconnected player's unsubmitted prompts to currently connected
/// players, preferring whoever holds the fewest prompts right now and
/// breaking ties by earliest `joined_at`. Returns the ids of prompts moved.
pub fn reassign_from(room: &mut Room, disconnected_player: PlayerId) -> Vec<Uuid> {
    let candidates: Vec<PlayerId> = {
        let mut candidates: Vec<&super::model::Player> = room
            .players
            .iter()
            .filter(|p| p.connected && !p.kicked && p.id != disconnected_player)
            .collect();
        candidates.sort_by_key(|p| p.joined_at);
        candidates.into_iter().map(|p| p.id).collect()
    };

    if candidates.is_empty() {
        return Vec::new();
    }

    let prompt_ids: Vec<Uuid> = room
        .prompts
        .iter()
        .filter(|p| p.assigned_player_id == Some(disconnected_player) && !p.submitted)
        .map(|p| p.id)
        .collect();

    let now = Utc::now();
    let mut moved = Vec::with_capacity(prompt_ids.len());
    for prompt_id in prompt_ids {
        let target = *candidates
            .iter()
            .min_by_key(|candidate| room.prompts_held_by(**candidate))
            .expect("candidates is non-empty");

        if let Some(prompt) = room.prompt_mut(prompt_id) {
            prompt.assigned_player_id = Some(target);
            prompt.last_reassigned_at = Some(now);
            moved.push(prompt_id);
        }
    }

    moved
}
