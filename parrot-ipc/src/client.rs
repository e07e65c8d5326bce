//! Websocket IPC client used by the dashboard process.

use crate::envelope::IpcRequest;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::debug;

/// Errors surfaced to IPC callers.
#[derive(Debug, Error)]
pub enum IpcClientError {
    /// The websocket connection failed
    #[error("IPC connection failed: {0}")]
    Transport(#[from] tungstenite::Error),

    /// The server closed the connection before replying
    #[error("IPC connection closed before a reply arrived")]
    Closed,

    /// The server answered with a structured error body
    #[error("IPC request failed with code {code}: {message}")]
    Remote {
        /// Error code (403 auth, 400 bad request, 500 handler failure)
        code: u16,
        /// Human-readable error message
        message: String,
    },

    /// Envelope encoding/decoding failed
    #[error("IPC serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shape of a structured error reply.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: u16,
}

/// One-request-per-connection IPC client.
///
/// The shim is deliberately simple: no retries, no pipelining. Each request
/// opens a connection, sends one envelope, and waits for the paired reply.
#[derive(Debug, Clone)]
pub struct IpcClient {
    url: String,
    secret: String,
}

impl IpcClient {
    /// Creates a client for `url` (e.g. `ws://127.0.0.1:8765/ws`).
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: secret.into(),
        }
    }

    /// Sends a request and waits for its reply.
    pub async fn request(&self, endpoint: &str, data: Value) -> Result<Value, IpcClientError> {
        let (mut socket, _) = connect_async(&self.url).await?;
        debug!(endpoint, "sending IPC request");

        let envelope = IpcRequest::new(endpoint, data, self.secret.clone());
        socket
            .send(tungstenite::Message::Text(serde_json::to_string(&envelope)?))
            .await?;

        while let Some(message) = socket.next().await {
            match message? {
                tungstenite::Message::Text(text) => {
                    let value: Value = serde_json::from_str(&text)?;
                    if let Ok(body) = serde_json::from_value::<ErrorBody>(value.clone()) {
                        return Err(IpcClientError::Remote {
                            code: body.code,
                            message: body.error,
                        });
                    }
                    return Ok(value);
                }
                tungstenite::Message::Close(_) => break,
                _ => {}
            }
        }
        Err(IpcClientError::Closed)
    }
}
