//! Guild line storage backends.

use crate::line::GuildLine;
use async_trait::async_trait;
use parrot_common::{GuildId, ParrotError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Storage seam for per-guild telephone lines.
///
/// Updates are best-effort read-modify-write; the store gives no
/// transactional guarantee across guilds. The relay compensates by resetting
/// busy flags idempotently on every call exit path.
#[async_trait]
pub trait LineStore: Send + Sync {
    /// Fetches the line for a guild, if one was ever created.
    async fn get(&self, guild: GuildId) -> Result<Option<GuildLine>>;

    /// Fetches the line for a guild, creating a blank record on first use.
    async fn get_or_create(&self, guild: GuildId) -> Result<GuildLine>;

    /// Writes a full line record.
    async fn put(&self, line: &GuildLine) -> Result<()>;

    /// Sets the busy flag for a guild's line. Idempotent; a missing record
    /// is created first so a reset can never be lost.
    async fn set_busy(&self, guild: GuildId, busy: bool) -> Result<()>;
}

/// In-memory line store used in tests and single-process setups.
#[derive(Debug, Default)]
pub struct MemoryLineStore {
    lines: Mutex<HashMap<GuildId, GuildLine>>,
}

impl MemoryLineStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LineStore for MemoryLineStore {
    async fn get(&self, guild: GuildId) -> Result<Option<GuildLine>> {
        Ok(self.lines.lock().unwrap().get(&guild).cloned())
    }

    async fn get_or_create(&self, guild: GuildId) -> Result<GuildLine> {
        let mut lines = self.lines.lock().unwrap();
        Ok(lines
            .entry(guild)
            .or_insert_with(|| GuildLine::new(guild))
            .clone())
    }

    async fn put(&self, line: &GuildLine) -> Result<()> {
        self.lines
            .lock()
            .unwrap()
            .insert(line.guild_id, line.clone());
        Ok(())
    }

    async fn set_busy(&self, guild: GuildId, busy: bool) -> Result<()> {
        let mut lines = self.lines.lock().unwrap();
        lines
            .entry(guild)
            .or_insert_with(|| GuildLine::new(guild))
            .busy = busy;
        Ok(())
    }
}

/// Sled-backed line store. Records are JSON-encoded under the guild ID.
pub struct SledLineStore {
    tree: sled::Tree,
    db: sled::Db,
}

impl SledLineStore {
    /// Opens (or creates) the store at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| ParrotError::store_with_source("failed to open line database", e))?;
        let tree = db
            .open_tree("lines")
            .map_err(|e| ParrotError::store_with_source("failed to open lines tree", e))?;
        debug!("Opened line store at {path}");
        Ok(Self { tree, db })
    }

    fn key(guild: GuildId) -> [u8; 8] {
        guild.0.to_be_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<GuildLine> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn write(&self, line: &GuildLine) -> Result<()> {
        let bytes = serde_json::to_vec(line)?;
        self.tree
            .insert(Self::key(line.guild_id), bytes)
            .map_err(|e| ParrotError::store_with_source("failed to write line record", e))?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| ParrotError::store_with_source("failed to flush line database", e))?;
        Ok(())
    }
}

#[async_trait]
impl LineStore for SledLineStore {
    async fn get(&self, guild: GuildId) -> Result<Option<GuildLine>> {
        let value = self
            .tree
            .get(Self::key(guild))
            .map_err(|e| ParrotError::store_with_source("failed to read line record", e))?;
        value.as_deref().map(Self::decode).transpose()
    }

    async fn get_or_create(&self, guild: GuildId) -> Result<GuildLine> {
        if let Some(line) = self.get(guild).await? {
            return Ok(line);
        }
        let line = GuildLine::new(guild);
        self.write(&line)?;
        self.flush().await?;
        Ok(line)
    }

    async fn put(&self, line: &GuildLine) -> Result<()> {
        self.write(line)?;
        self.flush().await
    }

    async fn set_busy(&self, guild: GuildId, busy: bool) -> Result<()> {
        let mut line = self
            .get(guild)
            .await?
            .unwrap_or_else(|| GuildLine::new(guild));
        line.busy = busy;
        self.write(&line)?;
        // The flag must be durable before the relay proceeds
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parrot_common::ChannelId;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryLineStore::new();
        assert!(store.get(GuildId(1)).await.unwrap().is_none());

        let mut line = store.get_or_create(GuildId(1)).await.unwrap();
        assert!(line.channel_id.is_none());

        line.channel_id = Some(ChannelId(10));
        store.put(&line).await.unwrap();

        let loaded = store.get(GuildId(1)).await.unwrap().unwrap();
        assert_eq!(loaded.channel_id, Some(ChannelId(10)));
    }

    #[tokio::test]
    async fn test_memory_store_set_busy_creates_record() {
        let store = MemoryLineStore::new();
        store.set_busy(GuildId(5), true).await.unwrap();
        assert!(store.get(GuildId(5)).await.unwrap().unwrap().busy);

        store.set_busy(GuildId(5), false).await.unwrap();
        assert!(!store.get(GuildId(5)).await.unwrap().unwrap().busy);
    }

    #[tokio::test]
    async fn test_sled_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledLineStore::open(dir.path().to_str().unwrap()).unwrap();

        let mut line = store.get_or_create(GuildId(42)).await.unwrap();
        line.channel_id = Some(ChannelId(99));
        line.blocked.insert(GuildId(7));
        store.put(&line).await.unwrap();

        let loaded = store.get(GuildId(42)).await.unwrap().unwrap();
        assert_eq!(loaded.channel_id, Some(ChannelId(99)));
        assert!(loaded.blocks(GuildId(7)));
    }

    #[tokio::test]
    async fn test_sled_store_busy_flip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledLineStore::open(dir.path().to_str().unwrap()).unwrap();

        store.set_busy(GuildId(1), true).await.unwrap();
        assert!(store.get(GuildId(1)).await.unwrap().unwrap().busy);

        // Idempotent reset
        store.set_busy(GuildId(1), false).await.unwrap();
        store.set_busy(GuildId(1), false).await.unwrap();
        assert!(!store.get(GuildId(1)).await.unwrap().unwrap().busy);
    }
}
