//! Loads `Config` from environment variables, falling back to defaults for
//! anything unset or unparsable, mirroring the teacher's `config::load()`.

use super::{defaults, Config};
use std::env;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Load configuration from the process environment.
pub fn load() -> Config {
    Config {
        port: env_or("PORT", defaults::default_port()),
        room_ttl_secs: env_or("ROOM_TTL", defaults::default_room_ttl_secs()),
        disconnect_grace_secs: env_or(
            "DISCONNECT_GRACE",
            defaults::default_disconnect_grace_secs(),
        ),
        prompts_per_player: env_or("PROMPTS_PER_PLAYER", defaults::default_prompts_per_player()),
        min_players_to_start: env_or(
            "MIN_PLAYERS_TO_START",
            defaults::default_min_players_to_start(),
        ),
        max_players_per_room: env_or(
            "MAX_PLAYERS_PER_ROOM",
            defaults::default_max_players_per_room(),
        ),
        share_ttl_secs: env_or("SHARE_TTL", defaults::default_share_ttl_secs()),
        socket_idle_timeout_secs: env_or(
            "SOCKET_IDLE_TIMEOUT",
            defaults::default_socket_idle_timeout_secs(),
        ),
        sweep_interval_secs: defaults::default_sweep_interval_secs(),
        sweep_grace_secs: defaults::default_sweep_grace_secs(),
        event_buffer_size: defaults::default_event_buffer_size(),
        max_code_generation_attempts: defaults::default_max_code_generation_attempts(),
        cors_origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| defaults::default_cors_origins()),
    }
}
