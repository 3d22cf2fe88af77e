//! Default value functions for configuration fields, organized by category,
//! following the teacher's `config/defaults.rs` convention of one small `const
//! fn` per field.

pub const fn default_port() -> u16 {
    8080
}

pub const fn default_room_ttl_secs() -> u64 {
    3600
}

pub const fn default_disconnect_grace_secs() -> u64 {
    30
}

pub const fn default_prompts_per_player() -> u8 {
    3
}

pub const fn default_min_players_to_start() -> u8 {
    2
}

pub const fn default_max_players_per_room() -> u8 {
    12
}

pub const fn default_share_ttl_secs() -> u64 {
    3600
}

pub const fn default_socket_idle_timeout_secs() -> u64 {
    60
}

pub const fn default_sweep_interval_secs() -> u64 {
    30
}

pub const fn default_sweep_grace_secs() -> u64 {
    5
}

pub const fn default_event_buffer_size() -> usize {
    64
}

pub const fn default_max_code_generation_attempts() -> u8 {
    8
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}
