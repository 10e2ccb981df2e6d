//! Burn record persistence
//!
//! Records are keyed by lowercased token symbol. An upsert replaces the whole
//! record so readers never observe a partially updated one.

use crate::burn::BurnRecord;
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Keyed storage of the latest record per token
#[async_trait]
pub trait BurnStore: Send + Sync {
    /// Insert or replace the record for `symbol`
    async fn upsert(&self, symbol: &str, record: &BurnRecord) -> Result<()>;

    /// Latest record for `symbol`, if any
    async fn get(&self, symbol: &str) -> Result<Option<BurnRecord>>;

    /// Every stored record, ordered by symbol
    async fn all(&self) -> Result<BTreeMap<String, BurnRecord>>;
}

fn store_key(symbol: &str) -> String {
    symbol.trim().to_lowercase()
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, BurnRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BurnStore for MemoryStore {
    async fn upsert(&self, symbol: &str, record: &BurnRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(store_key(symbol), record.clone());
        Ok(())
    }

    async fn get(&self, symbol: &str) -> Result<Option<BurnRecord>> {
        Ok(self.records.read().await.get(&store_key(symbol)).cloned())
    }

    async fn all(&self) -> Result<BTreeMap<String, BurnRecord>> {
        Ok(self.records.read().await.clone())
    }
}

/// One `<symbol>.json` document per token in a directory.
///
/// Writes go to a temporary sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) the store directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    async fn read_file(&self, key: &str, path: &Path) -> Result<BurnRecord> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|_| StoreError::Corrupted(key.to_string()).into())
    }
}

#[async_trait]
impl BurnStore for JsonFileStore {
    async fn upsert(&self, symbol: &str, record: &BurnRecord) -> Result<()> {
        let key = store_key(symbol);
        let path = self.path_for(&key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));

        let write_err = |e: std::io::Error| StoreError::Write {
            key: key.clone(),
            reason: e.to_string(),
        };

        let content = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&tmp, content).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(write_err)?;

        tracing::debug!("Saved {} to {}", key, path.display());
        Ok(())
    }

    async fn get(&self, symbol: &str) -> Result<Option<BurnRecord>> {
        let key = store_key(symbol);
        let path = self.path_for(&key);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        self.read_file(&key, &path).await.map(Some)
    }

    async fn all(&self) -> Result<BTreeMap<String, BurnRecord>> {
        let mut records = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n,
                None => continue,
            };
            if name.starts_with('.') {
                continue;
            }
            let Some(key) = name.strip_suffix(".json") else {
                continue;
            };

            match self.read_file(key, &path).await {
                Ok(record) => {
                    records.insert(key.to_string(), record);
                }
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(records)
    }
}
