//! Configuration sanity checks run at startup, generalizing the teacher's
//! `validate_config_security` into the invariants this crate's config needs.

use super::Config;
use anyhow::{bail, Result};

pub fn validate_config(config: &Config) -> Result<()> {
    if config.min_players_to_start < 1 {
        bail!("MIN_PLAYERS_TO_START must be at least 1");
    }
    if config.max_players_per_room < config.min_players_to_start {
        bail!("MAX_PLAYERS_PER_ROOM must be >= MIN_PLAYERS_TO_START");
    }
    if config.prompts_per_player < 1 {
        bail!("PROMPTS_PER_PLAYER must be at least 1");
    }
    if config.disconnect_grace_secs == 0 {
        bail!("DISCONNECT_GRACE must be greater than zero");
    }
    if config.room_ttl_secs == 0 {
        bail!("ROOM_TTL must be greater than zero");
    }
    Ok(())
}
