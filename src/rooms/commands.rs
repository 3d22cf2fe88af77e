//! Pure-ish command functions that mutate a `Room` under its lock.
//!
//! Every function here assumes the caller already holds the room's
//! exclusive lock (see `RoomStore::with_room`) and will bump
//! `state_version` / publish a snapshot event afterwards. Rejected commands
//! return a typed `AppError` without mutating state.

use super::assigner;
use super::model::{PlayerId, PromptId, Room, RoomState, ShareArtifact};
use crate::config::Config;
use crate::error::AppError;
use crate::ids;
use crate::moderation::ContentFilter;
use crate::templates::{self, Template};
use chrono::Utc;
use uuid::Uuid;

fn require_host(room: &Room, host_token: &str) -> Result<(), AppError> {
    if room.is_host_token(host_token) {
        Ok(())
    } else {
        Err(AppError::Auth)
    }
}

fn require_player(room: &Room, player_id: PlayerId, player_token: &str) -> Result<(), AppError> {
    match room.player(player_id) {
        Some(player) if ids::secrets_match(&player.token, player_token) && !player.kicked => Ok(()),
        _ => Err(AppError::Auth),
    }
}

fn ensure_not_expired(room: &Room) -> Result<(), AppError> {
    if room.state == RoomState::Expired {
        Err(AppError::Expired)
    } else {
        Ok(())
    }
}

fn sanitize_display_name(raw: Option<String>, fallback_index: usize) -> String {
    const MAX_LEN: usize = 24;
    let candidate = raw.unwrap_or_default();
    let sanitized: String = candidate
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .take(MAX_LEN)
        .collect();
    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        format!("Player {}", fallback_index + 1)
    } else {
        trimmed.to_string()
    }
}

/// Construct a brand-new room in `LobbyOpen`, with the host as the first
/// player. Id/code uniqueness is the caller's (the store's) responsibility.
pub fn new_room(
    room_id: Uuid,
    room_code: String,
    host_display_name: Option<String>,
) -> (Room, String, String) {
    let host_player_id = ids::new_player_id();
    let host_token = ids::generate_token();
    let player_token = ids::generate_token();

    let mut room = Room::new(room_id, room_code, host_player_id, host_token.clone());
    room.players.push(super::model::Player {
        id: host_player_id,
        display_name: sanitize_display_name(host_display_name, 0),
        token: player_token.clone(),
        is_host: true,
        connected: false,
        disconnected_at: None,
        joined_at: Utc::now(),
        kicked: false,
    });

    (room, host_token, player_token)
}

pub fn join(
    room: &mut Room,
    config: &Config,
    display_name: Option<String>,
) -> Result<(PlayerId, String), AppError> {
    ensure_not_expired(room)?;
    if room.state != RoomState::LobbyOpen {
        return Err(AppError::StateConflict(
            "room is no longer accepting new players".to_string(),
        ));
    }
    if room.locked {
        return Err(AppError::Locked);
    }
    if room.players.iter().filter(|p| !p.kicked).count() >= config.max_players_per_room as usize {
        return Err(AppError::Full);
    }

    let player_id = ids::new_player_id();
    let token = ids::generate_token();
    let index = room.players.len();

    room.players.push(super::model::Player {
        id: player_id,
        display_name: sanitize_display_name(display_name, index),
        token: token.clone(),
        is_host: false,
        connected: false,
        disconnected_at: None,
        joined_at: Utc::now(),
        kicked: false,
    });

    room.bump_version();
    Ok((player_id, token))
}

pub fn leave(room: &mut Room, player_id: PlayerId, player_token: &str) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_player(room, player_id, player_token)?;

    if room.state == RoomState::Prompting {
        assigner::reassign_from(room, player_id);
    }
    room.players.retain(|p| p.id != player_id);
    room.bump_version();
    Ok(())
}

pub fn set_locked(room: &mut Room, host_token: &str, locked: bool) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_host(room, host_token)?;
    if room.state != RoomState::LobbyOpen {
        return Err(AppError::StateConflict("can only lock/unlock before start".to_string()));
    }
    room.locked = locked;
    room.bump_version();
    Ok(())
}

pub fn set_template(room: &mut Room, host_token: &str, template_id: &str) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_host(room, host_token)?;
    if room.state != RoomState::LobbyOpen {
        return Err(AppError::StateConflict(
            "template can only be set in the lobby".to_string(),
        ));
    }
    if templates::get(template_id).is_none() {
        return Err(AppError::Validation(format!("unknown template '{template_id}'")));
    }
    room.template_id = Some(template_id.to_string());
    room.bump_version();
    Ok(())
}

/// Kick a player. Per the design spec's resolved open question, this
/// reassigns the kicked player's prompts immediately rather than waiting for
/// `DisconnectGrace` (kick is treated as an explicit forced disconnect).
pub fn kick(room: &mut Room, host_token: &str, target: PlayerId) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_host(room, host_token)?;
    if target == room.host_player_id {
        return Err(AppError::Validation("the host cannot be kicked".to_string()));
    }
    if room.player(target).is_none() {
        return Err(AppError::NotFound("player not found".to_string()));
    }

    if room.state == RoomState::Prompting {
        assigner::reassign_from(room, target);
    }

    if let Some(player) = room.player_mut(target) {
        player.kicked = true;
        player.connected = false;
    }
    room.players.retain(|p| p.id != target);
    room.bump_version();
    Ok(())
}

pub fn start(
    room: &mut Room,
    host_token: &str,
    config: &Config,
) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_host(room, host_token)?;
    if room.state != RoomState::LobbyOpen {
        return Err(AppError::StateConflict("room is not in the lobby".to_string()));
    }
    let template_id = room
        .template_id
        .clone()
        .ok_or_else(|| AppError::StateConflict("no template selected".to_string()))?;
    let template: &Template = templates::get(&template_id)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("selected template vanished")))?;

    if room.players.len() < config.min_players_to_start as usize {
        return Err(AppError::StateConflict(format!(
            "need at least {} players to start",
            config.min_players_to_start
        )));
    }

    assigner::deal(template, room, config.prompts_per_player);
    room.state = RoomState::Prompting;
    room.bump_version();
    Ok(())
}

pub fn submit_prompt(
    room: &mut Room,
    player_id: PlayerId,
    player_token: &str,
    prompt_id: PromptId,
    value: &str,
    filter: &dyn ContentFilter,
) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_player(room, player_id, player_token)?;

    let slot_type = {
        let prompt = room
            .prompt(prompt_id)
            .ok_or_else(|| AppError::NotFound("prompt not found".to_string()))?;
        if prompt.assigned_player_id != Some(player_id) {
            return Err(AppError::Auth);
        }
        if prompt.submitted {
            // Idempotency: identical resubmission is accepted silently even if
            // this submission was the one that moved the room out of
            // Prompting (e.g. a client retry after a dropped response), a
            // different value for an already-submitted prompt conflicts.
            if prompt.value.as_deref() == Some(value) {
                return Ok(());
            }
            return Err(AppError::StateConflict("prompt already submitted".to_string()));
        }
        prompt.slot_type
    };

    if room.state != RoomState::Prompting {
        return Err(AppError::StateConflict("room is not accepting submissions".to_string()));
    }

    if !crate::moderation::is_ascii_printable(value) {
        return Err(AppError::Validation("value must be ASCII printable".to_string()));
    }
    if value.is_empty() || value.len() > slot_type.max_value_len() {
        return Err(AppError::Validation(format!(
            "value must be 1-{} characters",
            slot_type.max_value_len()
        )));
    }
    if !filter.is_allowed(value) {
        return Err(AppError::Validation("value contains a blocked term".to_string()));
    }

    let prompt = room.prompt_mut(prompt_id).expect("checked above");
    prompt.value = Some(value.to_string());
    prompt.submitted = true;
    prompt.submitted_at = Some(Utc::now());

    let all_submitted = room.all_submitted();
    if all_submitted {
        room.state = RoomState::AwaitingReveal;
    }
    room.bump_version();
    Ok(())
}

pub fn reveal(room: &mut Room, host_token: &str) -> Result<String, AppError> {
    ensure_not_expired(room)?;
    require_host(room, host_token)?;
    if room.state != RoomState::AwaitingReveal {
        return Err(AppError::StateConflict(
            "not every prompt has been submitted yet".to_string(),
        ));
    }
    let template_id = room
        .template_id
        .clone()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("no template on reveal")))?;
    let template = templates::get(&template_id)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("template vanished before reveal")))?;

    let values = room
        .prompts
        .iter()
        .filter_map(|p| p.value.clone().map(|v| (p.slot_id.clone(), v)))
        .collect();

    let story = super::renderer::render(template, &values);
    room.revealed_story = Some(story.clone());
    room.state = RoomState::Revealed;
    room.bump_version();
    Ok(story)
}

pub fn replay(room: &mut Room, host_token: &str, config: &Config) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_host(room, host_token)?;
    if room.state != RoomState::Revealed {
        return Err(AppError::StateConflict("nothing to replay yet".to_string()));
    }
    let template_id = room
        .template_id
        .clone()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("no template on replay")))?;
    let template = templates::get(&template_id)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("template vanished before replay")))?;

    room.previous_revealed = Some(super::model::RevealedRound {
        round_id: room.round_id,
        template_id,
        story: room.revealed_story.clone().unwrap_or_default(),
    });

    room.round_id = ids::new_round_id();
    room.round_index += 1;
    room.revealed_story = None;
    room.narration = None;
    room.share = None;

    assigner::deal(template, room, config.prompts_per_player);
    room.state = RoomState::Prompting;
    room.bump_version();
    Ok(())
}

/// Create (or idempotently return) a share artifact for the currently
/// revealed story. A second call within the same round returns the same
/// token rather than minting a new one, unless that token has already
/// expired, in which case a fresh one is minted.
pub fn create_share(room: &mut Room, host_token: &str, config: &Config) -> Result<ShareArtifact, AppError> {
    ensure_not_expired(room)?;
    require_host(room, host_token)?;
    if room.state != RoomState::Revealed {
        return Err(AppError::StateConflict(
            "nothing to share until the story is revealed".to_string(),
        ));
    }
    if let Some(existing) = &room.share {
        if existing.round_id == room.round_id && existing.expires_at > Utc::now() {
            return Ok(existing.clone());
        }
    }

    let story = room
        .revealed_story
        .clone()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("no story to share")))?;
    let artifact = ShareArtifact {
        share_token: ids::generate_token(),
        room_code: room.room_code.clone(),
        round_id: room.round_id,
        rendered_story: story,
        expires_at: Utc::now() + chrono::Duration::from_std(config.share_ttl()).unwrap_or_default(),
    };
    room.share = Some(artifact.clone());
    room.bump_version();
    Ok(artifact)
}

pub fn reconnect(room: &mut Room, player_id: PlayerId, player_token: &str) -> Result<(), AppError> {
    ensure_not_expired(room)?;
    require_player(room, player_id, player_token)?;
    let player = room.player_mut(player_id).expect("checked above");
    player.connected = true;
    player.disconnected_at = None;
    room.bump_version();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::default_filter;

    fn fresh_room(player_count: usize) -> (Room, Vec<(PlayerId, String)>, String) {
        let (mut room, host_token, host_player_token) =
            new_room(Uuid::new_v4(), "ABCDEF".to_string(), Some("Host".to_string()));
        let host_id = room.host_player_id;
        let mut tokens = vec![(host_id, host_player_token)];

        let config = Config::default();
        for i in 1..player_count {
            let (pid, token) = join(&mut room, &config, Some(format!("Guest{i}"))).unwrap();
            tokens.push((pid, token));
        }
        (room, tokens, host_token)
    }

    #[test]
    fn start_requires_template_and_min_players() {
        let (mut room, _tokens, host_token) = fresh_room(1);
        let config = Config::default();
        assert!(matches!(
            start(&mut room, &host_token, &config),
            Err(AppError::StateConflict(_))
        ));

        room.template_id = Some("t-forest-mishap".to_string());
        assert!(matches!(
            start(&mut room, &host_token, &config),
            Err(AppError::StateConflict(_))
        ));
    }

    #[test]
    fn full_round_trip_reaches_revealed() {
        let (mut room, tokens, host_token) = fresh_room(2);
        let config = Config::default();
        set_template(&mut room, &host_token, "t-forest-mishap").unwrap();
        start(&mut room, &host_token, &config).unwrap();
        assert_eq!(room.state, RoomState::Prompting);

        let filter = default_filter();
        let prompt_ids: Vec<_> = room.prompts.iter().map(|p| p.id).collect();
        for prompt_id in prompt_ids {
            let assigned = room.prompt(prompt_id).unwrap().assigned_player_id.unwrap();
            let (_, token) = tokens.iter().find(|(id, _)| *id == assigned).unwrap();
            submit_prompt(&mut room, assigned, token, prompt_id, "value", filter.as_ref()).unwrap();
        }

        assert_eq!(room.state, RoomState::AwaitingReveal);
        let story = reveal(&mut room, &host_token).unwrap();
        assert_eq!(room.state, RoomState::Revealed);
        assert_eq!(room.revealed_story.as_deref(), Some(story.as_str()));
    }

    #[test]
    fn submit_prompt_rejects_wrong_player() {
        let (mut room, tokens, host_token) = fresh_room(2);
        let config = Config::default();
        set_template(&mut room, &host_token, "t-forest-mishap").unwrap();
        start(&mut room, &host_token, &config).unwrap();

        let filter = default_filter();
        let prompt = room.prompts[0].clone();
        let wrong_player = tokens
            .iter()
            .find(|(id, _)| Some(*id) != prompt.assigned_player_id)
            .unwrap();

        let result = submit_prompt(
            &mut room,
            wrong_player.0,
            &wrong_player.1,
            prompt.id,
            "value",
            filter.as_ref(),
        );
        assert!(matches!(result, Err(AppError::Auth)));
    }

    #[test]
    fn resubmitting_identical_value_is_idempotent() {
        let (mut room, tokens, host_token) = fresh_room(2);
        let config = Config::default();
        set_template(&mut room, &host_token, "t-forest-mishap").unwrap();
        start(&mut room, &host_token, &config).unwrap();

        let filter = default_filter();
        let prompt = room.prompts[0].clone();
        let (player_id, token) = tokens.iter().find(|(id, _)| Some(*id) == prompt.assigned_player_id).unwrap();

        submit_prompt(&mut room, *player_id, token, prompt.id, "brave", filter.as_ref()).unwrap();
        assert!(submit_prompt(&mut room, *player_id, token, prompt.id, "brave", filter.as_ref()).is_ok());
        assert!(matches!(
            submit_prompt(&mut room, *player_id, token, prompt.id, "different", filter.as_ref()),
            Err(AppError::StateConflict(_))
        ));
    }

    #[test]
    fn resubmitting_identical_value_is_accepted_after_room_leaves_prompting() {
        let (mut room, tokens, host_token) = fresh_room(2);
        let config = Config::default();
        set_template(&mut room, &host_token, "t-forest-mishap").unwrap();
        start(&mut room, &host_token, &config).unwrap();

        let filter = default_filter();
        let prompt_ids: Vec<_> = room.prompts.iter().map(|p| p.id).collect();
        for prompt_id in &prompt_ids {
            let assigned = room.prompt(*prompt_id).unwrap().assigned_player_id.unwrap();
            let (_, token) = tokens.iter().find(|(id, _)| *id == assigned).unwrap();
            submit_prompt(&mut room, assigned, token, *prompt_id, "value", filter.as_ref()).unwrap();
        }
        assert_eq!(room.state, RoomState::AwaitingReveal);

        // The last submission above already moved the room to AwaitingReveal.
        // A client retrying that same submission (e.g. after a dropped
        // response) must still be accepted, not rejected for the room no
        // longer being in Prompting.
        let last_prompt_id = *prompt_ids.last().unwrap();
        let assigned = room.prompt(last_prompt_id).unwrap().assigned_player_id.unwrap();
        let (_, token) = tokens.iter().find(|(id, _)| *id == assigned).unwrap();
        assert!(submit_prompt(&mut room, assigned, token, last_prompt_id, "value", filter.as_ref()).is_ok());
        assert_eq!(room.state, RoomState::AwaitingReveal);
    }

    #[test]
    fn create_share_mints_a_fresh_token_once_the_previous_one_expired() {
        let (mut room, tokens, host_token) = fresh_room(2);
        let config = Config {
            share_ttl_secs: 0,
            ..Config::default()
        };
        set_template(&mut room, &host_token, "t-forest-mishap").unwrap();
        start(&mut room, &host_token, &config).unwrap();

        let filter = default_filter();
        let prompt_ids: Vec<_> = room.prompts.iter().map(|p| p.id).collect();
        for prompt_id in prompt_ids {
            let assigned = room.prompt(prompt_id).unwrap().assigned_player_id.unwrap();
            let (_, token) = tokens.iter().find(|(id, _)| *id == assigned).unwrap();
            submit_prompt(&mut room, assigned, token, prompt_id, "value", filter.as_ref()).unwrap();
        }
        reveal(&mut room, &host_token).unwrap();

        let first = create_share(&mut room, &host_token, &config).unwrap();
        let second = create_share(&mut room, &host_token, &config).unwrap();
        assert_ne!(first.share_token, second.share_token);
    }

    #[test]
    fn create_share_is_idempotent_before_expiry() {
        let (mut room, tokens, host_token) = fresh_room(2);
        let config = Config::default();
        set_template(&mut room, &host_token, "t-forest-mishap").unwrap();
        start(&mut room, &host_token, &config).unwrap();

        let filter = default_filter();
        let prompt_ids: Vec<_> = room.prompts.iter().map(|p| p.id).collect();
        for prompt_id in prompt_ids {
            let assigned = room.prompt(prompt_id).unwrap().assigned_player_id.unwrap();
            let (_, token) = tokens.iter().find(|(id, _)| *id == assigned).unwrap();
            submit_prompt(&mut room, assigned, token, prompt_id, "value", filter.as_ref()).unwrap();
        }
        reveal(&mut room, &host_token).unwrap();

        let first = create_share(&mut room, &host_token, &config).unwrap();
        let second = create_share(&mut room, &host_token, &config).unwrap();
        assert_eq!(first.share_token, second.share_token);
    }

    #[test]
    fn replay_rotates_round_and_clears_artifacts() {
        let (mut room, tokens, host_token) = fresh_room(2);
        let config = Config::default();
        set_template(&mut room, &host_token, "t-forest-mishap").unwrap();
        start(&mut room, &host_token, &config).unwrap();

        let filter = default_filter();
        let prompt_ids: Vec<_> = room.prompts.iter().map(|p| p.id).collect();
        for prompt_id in prompt_ids {
            let assigned = room.prompt(prompt_id).unwrap().assigned_player_id.unwrap();
            let (_, token) = tokens.iter().find(|(id, _)| *id == assigned).unwrap();
            submit_prompt(&mut room, assigned, token, prompt_id, "value", filter.as_ref()).unwrap();
        }
        reveal(&mut room, &host_token).unwrap();

        let old_round_id = room.round_id;
        replay(&mut room, &host_token, &config).unwrap();

        assert_eq!(room.round_index, 1);
        assert_ne!(room.round_id, old_round_id);
        assert_eq!(room.state, RoomState::Prompting);
        assert!(room.revealed_story.is_none());
        assert_eq!(room.previous_revealed.as_ref().unwrap().round_id, old_round_id);
    }

    #[test]
    fn join_rejects_when_full() {
        let config = Config {
            max_players_per_room: 2,
            ..Config::default()
        };
        let (mut room, _tokens, _host_token) =
            fresh_room(1);
        join(&mut room, &config, None).unwrap();
        assert!(matches!(join(&mut room, &config, None), Err(AppError::Full)));
    }

    #[test]
    fn join_rejects_when_locked() {
        let (mut room, _tokens, host_token) = fresh_room(1);
        let config = Config::default();
        set_locked(&mut room, &host_token, true).unwrap();
        assert!(matches!(join(&mut room, &config, None), Err(AppError::Locked)));
    }
}
