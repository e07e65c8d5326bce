//! Websocket IPC server hosted inside the bot process.

use crate::envelope::{error_body, IpcRequest};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use parrot_common::{ParrotError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Boxed async route handler: JSON payload in, JSON payload (or an error
/// message surfaced as a 500 body) out.
pub type RouteHandler = Arc<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = std::result::Result<Value, String>> + Send>>
        + Send
        + Sync,
>;

/// The IPC server: a fixed route table resolved at construction time plus
/// the shared secret every request must carry.
pub struct IpcServer {
    routes: HashMap<String, RouteHandler>,
    secret: String,
}

impl IpcServer {
    /// Creates a server with an empty route table.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            routes: HashMap::new(),
            secret: secret.into(),
        }
    }

    /// Registers a route handler. Routes are fixed once serving starts.
    pub fn route<F, Fut>(mut self, endpoint: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, String>> + Send + 'static,
    {
        self.routes
            .insert(endpoint.into(), Arc::new(move |data| Box::pin(handler(data))));
        self
    }

    /// Handles one raw request and produces the reply body.
    ///
    /// Authorization is checked before the endpoint is even looked at, so a
    /// bad secret yields 403 for valid and invalid endpoints alike.
    pub async fn dispatch(&self, text: &str) -> Value {
        let request: IpcRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => return error_body(format!("malformed request: {e}"), 400),
        };

        if request.headers.authorization != self.secret {
            debug!(endpoint = %request.endpoint, "rejected request with bad secret");
            return error_body("invalid authorization", 403);
        }

        let Some(handler) = self.routes.get(&request.endpoint) else {
            return error_body(format!("unknown endpoint '{}'", request.endpoint), 400);
        };

        match handler(request.data).await {
            Ok(value) => value,
            Err(message) => {
                warn!(endpoint = %request.endpoint, error = %message, "route handler failed");
                error_body(message, 500)
            }
        }
    }

    /// Binds and serves until the task is cancelled.
    pub async fn serve(self: Arc<Self>, bind_address: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_address)
            .await
            .map_err(|e| ParrotError::ipc_with_source("failed to bind IPC server", e))?;
        info!("IPC server listening on {bind_address}");
        self.serve_on(listener).await
    }

    /// Serves on an already-bound listener (used by tests).
    pub async fn serve_on(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let app = Router::new()
            .route("/ws", get(ws_upgrade))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self);

        axum::serve(listener, app)
            .await
            .map_err(|e| ParrotError::ipc_with_source("IPC server failed", e))?;
        Ok(())
    }
}

async fn ws_upgrade(
    State(server): State<Arc<IpcServer>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}

async fn handle_socket(mut socket: WebSocket, server: Arc<IpcServer>) {
    debug!("IPC connection opened");
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => {
                let reply = server.dispatch(&text).await;
                let reply = serde_json::to_string(&reply)
                    .unwrap_or_else(|_| r#"{"error": "serialization failure", "code": 500}"#.into());
                if socket.send(Message::Text(reply)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are ignored
            _ => {}
        }
    }
    debug!("IPC connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_server() -> IpcServer {
        IpcServer::new("top-secret")
            .route("guild_count", |_data| async move { Ok(json!({"guilds": 3})) })
            .route("boom", |_data| async move { Err("handler exploded".to_string()) })
            .route("echo", |data| async move { Ok(json!({"echo": data})) })
    }

    fn request(endpoint: &str, secret: &str) -> String {
        serde_json::to_string(&IpcRequest::new(endpoint, Value::Null, secret)).unwrap()
    }

    #[tokio::test]
    async fn test_bad_secret_is_403_regardless_of_endpoint() {
        let server = test_server();

        let reply = server.dispatch(&request("guild_count", "wrong")).await;
        assert_eq!(reply["code"], 403);

        let reply = server.dispatch(&request("does_not_exist", "wrong")).await;
        assert_eq!(reply["code"], 403);

        // Missing headers entirely
        let reply = server.dispatch(r#"{"endpoint": "guild_count"}"#).await;
        assert_eq!(reply["code"], 403);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_400() {
        let server = test_server();
        let reply = server.dispatch(&request("does_not_exist", "top-secret")).await;
        assert_eq!(reply["code"], 400);
        assert!(reply["error"].as_str().unwrap().contains("unknown endpoint"));
    }

    #[tokio::test]
    async fn test_handler_error_is_500() {
        let server = test_server();
        let reply = server.dispatch(&request("boom", "top-secret")).await;
        assert_eq!(reply["code"], 500);
        assert_eq!(reply["error"], "handler exploded");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let server = test_server();
        let reply = server.dispatch("{not json").await;
        assert_eq!(reply["code"], 400);
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let server = test_server();
        let reply = server.dispatch(&request("guild_count", "top-secret")).await;
        assert_eq!(reply["guilds"], 3);
    }

    #[tokio::test]
    async fn test_data_reaches_handler() {
        let server = test_server();
        let envelope = serde_json::to_string(&IpcRequest::new(
            "echo",
            json!({"hello": "world"}),
            "top-secret",
        ))
        .unwrap();
        let reply = server.dispatch(&envelope).await;
        assert_eq!(reply["echo"]["hello"], "world");
    }
}
