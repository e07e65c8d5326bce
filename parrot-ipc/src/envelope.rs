//! The JSON envelope exchanged over the IPC websocket.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Headers carried on every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpcHeaders {
    /// Shared secret; must match the server's on every request
    #[serde(default, rename = "Authorization")]
    pub authorization: String,
}

/// A single request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcRequest {
    /// Name of the route to invoke
    pub endpoint: String,
    /// Route-specific payload
    #[serde(default)]
    pub data: Value,
    /// Request headers
    #[serde(default)]
    pub headers: IpcHeaders,
}

impl IpcRequest {
    /// Builds a request with the given secret filled in.
    pub fn new(endpoint: impl Into<String>, data: Value, secret: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            data,
            headers: IpcHeaders {
                authorization: secret.into(),
            },
        }
    }
}

/// Builds a structured error response body.
pub fn error_body(message: impl Into<String>, code: u16) -> Value {
    json!({ "error": message.into(), "code": code })
}
