//! StoryFill: an in-memory multiplayer room orchestration server for a
//! collaborative fill-in-the-blanks story game.

pub mod bus;
pub mod config;
pub mod error;
pub mod http;
pub mod ids;
pub mod logging;
pub mod moderation;
pub mod narration;
pub mod rate_limit;
pub mod rooms;
pub mod templates;
pub mod websocket;
