//! Common types and utilities shared across the Parrot workspace.

pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

pub use error::{ParrotError, Result};
pub use types::{ChannelId, GuildId, RoleId, UserId};
