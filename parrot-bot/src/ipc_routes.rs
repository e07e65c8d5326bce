//! Route table for the websocket IPC bridge.
//!
//! Every route is registered here at startup; there is no dynamic dispatch
//! beyond the fixed table.

use parrot_common::GuildId;
use parrot_ipc::IpcServer;
use parrot_telephone::{CallRelay, LineStore};
use poise::serenity_prelude as serenity;
use serde_json::{json, Value};
use std::sync::Arc;

/// Builds the IPC server with all bot routes registered.
pub fn build_ipc_server(
    secret: &str,
    relay: Arc<CallRelay>,
    store: Arc<dyn LineStore>,
    cache: Arc<serenity::Cache>,
) -> IpcServer {
    IpcServer::new(secret)
        .route("guild_count", {
            let cache = cache.clone();
            move |_data| {
                let cache = cache.clone();
                async move { Ok(json!({ "guilds": cache.guilds().len() })) }
            }
        })
        .route("active_calls", {
            let relay = relay.clone();
            move |_data| {
                let relay = relay.clone();
                async move { Ok(json!({ "calls": relay.active_calls() })) }
            }
        })
        .route("line_status", {
            let store = store.clone();
            move |data| {
                let store = store.clone();
                async move {
                    let guild_id = data
                        .get("guild_id")
                        .and_then(Value::as_u64)
                        .ok_or_else(|| "missing or invalid 'guild_id'".to_string())?;
                    let line = store
                        .get(GuildId(guild_id))
                        .await
                        .map_err(|e| e.to_string())?;
                    match line {
                        Some(line) => {
                            let mut value =
                                serde_json::to_value(&line).map_err(|e| e.to_string())?;
                            if let Some(object) = value.as_object_mut() {
                                object.insert("configured".into(), json!(true));
                            }
                            Ok(value)
                        }
                        None => Ok(json!({ "guild_id": guild_id, "configured": false })),
                    }
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parrot_common::ChannelId;
    use parrot_ipc::IpcRequest;
    use parrot_telephone::{GuildLine, MemoryLineStore, RelaySettings};

    fn test_server(store: Arc<dyn LineStore>) -> IpcServer {
        let relay = Arc::new(CallRelay::new(store.clone(), RelaySettings::default()));
        build_ipc_server("hush", relay, store, Arc::new(serenity::Cache::new()))
    }

    fn request(endpoint: &str, data: Value) -> String {
        serde_json::to_string(&IpcRequest::new(endpoint, data, "hush")).unwrap()
    }

    #[tokio::test]
    async fn test_line_status_for_unknown_guild() {
        let store: Arc<dyn LineStore> = Arc::new(MemoryLineStore::new());
        let server = test_server(store);

        let reply = server
            .dispatch(&request("line_status", json!({ "guild_id": 1 })))
            .await;
        assert_eq!(reply["configured"], false);
    }

    #[tokio::test]
    async fn test_line_status_for_configured_guild() {
        let store: Arc<dyn LineStore> = Arc::new(MemoryLineStore::new());
        let mut line = GuildLine::new(GuildId(5));
        line.channel_id = Some(ChannelId(10));
        store.put(&line).await.unwrap();
        let server = test_server(store);

        let reply = server
            .dispatch(&request("line_status", json!({ "guild_id": 5 })))
            .await;
        assert_eq!(reply["configured"], true);
        assert_eq!(reply["channel_id"], 10);
        assert_eq!(reply["busy"], false);
    }

    #[tokio::test]
    async fn test_line_status_requires_guild_id() {
        let store: Arc<dyn LineStore> = Arc::new(MemoryLineStore::new());
        let server = test_server(store);

        let reply = server.dispatch(&request("line_status", json!({}))).await;
        assert_eq!(reply["code"], 500);
    }

    #[tokio::test]
    async fn test_active_calls_starts_empty() {
        let store: Arc<dyn LineStore> = Arc::new(MemoryLineStore::new());
        let server = test_server(store);

        let reply = server.dispatch(&request("active_calls", json!({}))).await;
        assert_eq!(reply["calls"].as_array().unwrap().len(), 0);
    }
}
