//! Request/response IPC bridge over a websocket.
//!
//! The dashboard process sends one JSON envelope per request; the bot
//! process answers with the handler's JSON object or a structured
//! `{"error", "code"}` body. Authorization is a shared secret carried in
//! every envelope; failures cross the wire as error objects, never as
//! closed connections.

pub mod client;
pub mod envelope;
pub mod server;

pub use client::{IpcClient, IpcClientError};
pub use envelope::{error_body, IpcHeaders, IpcRequest};
pub use server::{IpcServer, RouteHandler};
