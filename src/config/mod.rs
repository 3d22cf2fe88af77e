//! Configuration module for the StoryFill server.
//!
//! Values are loaded from environment variables with sensible defaults,
//! following the teacher's env-var-driven `config::load()` pattern.

pub mod defaults;
pub mod loader;
pub mod validation;

pub use loader::load;
pub use validation::validate_config;

use serde::Serialize;
use std::time::Duration;

/// Root server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub port: u16,
    pub room_ttl_secs: u64,
    pub disconnect_grace_secs: u64,
    pub prompts_per_player: u8,
    pub min_players_to_start: u8,
    pub max_players_per_room: u8,
    pub share_ttl_secs: u64,
    pub socket_idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub sweep_grace_secs: u64,
    pub event_buffer_size: usize,
    pub max_code_generation_attempts: u8,
    pub cors_origins: String,
}

impl Config {
    pub fn room_ttl(&self) -> Duration {
        Duration::from_secs(self.room_ttl_secs)
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_secs(self.disconnect_grace_secs)
    }

    pub fn share_ttl(&self) -> Duration {
        Duration::from_secs(self.share_ttl_secs)
    }

    pub fn socket_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn sweep_grace(&self) -> Duration {
        Duration::from_secs(self.sweep_grace_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::default_port(),
            room_ttl_secs: defaults::default_room_ttl_secs(),
            disconnect_grace_secs: defaults::default_disconnect_grace_secs(),
            prompts_per_player: defaults::default_prompts_per_player(),
            min_players_to_start: defaults::default_min_players_to_start(),
            max_players_per_room: defaults::default_max_players_per_room(),
            share_ttl_secs: defaults::default_share_ttl_secs(),
            socket_idle_timeout_secs: defaults::default_socket_idle_timeout_secs(),
            sweep_interval_secs: defaults::default_sweep_interval_secs(),
            sweep_grace_secs: defaults::default_sweep_grace_secs(),
            event_buffer_size: defaults::default_event_buffer_size(),
            max_code_generation_attempts: defaults::default_max_code_generation_attempts(),
            cors_origins: defaults::default_cors_origins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.room_ttl_secs, 3600);
        assert_eq!(config.disconnect_grace_secs, 30);
        assert_eq!(config.prompts_per_player, 3);
        assert_eq!(config.min_players_to_start, 2);
        assert_eq!(config.socket_idle_timeout_secs, 60);
    }
}
