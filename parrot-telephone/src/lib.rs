//! Cross-server telephone relay for Parrot.
//!
//! Two guilds each configure a "line" (a channel plus busy state). A dial
//! marks both lines busy, rings the callee channel, and on `pickup` mirrors
//! messages between the two channels until the call ends. Every exit path
//! releases both busy flags exactly once.

pub mod gateway;
pub mod line;
pub mod rate_limit;
pub mod relay;
pub mod store;

pub use gateway::{LineGateway, LineMessage};
pub use line::GuildLine;
pub use rate_limit::MessageWindow;
pub use relay::{
    ActiveCall, CallOutcome, CallRelay, CallState, DialError, EndReason, RelayMode, RelaySettings,
};
pub use store::{LineStore, MemoryLineStore, SledLineStore};
