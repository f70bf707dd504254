// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Key-value blob backends the chain store persists through.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::ChainError;

/// Durable storage for structured blobs addressed by a fixed key.
#[async_trait]
pub trait ChainStorage: Send + Sync {
    /// Returns `Ok(None)` when nothing was ever stored under `key`.
    async fn read(&self, key: &str) -> Result<Option<Value>, ChainError>;

    async fn write(&self, key: &str, value: Value) -> Result<(), ChainError>;
}

fn persist_err(e: impl std::fmt::Display) -> ChainError {
    ChainError::PersistenceFailure(e.to_string())
}

/// Stores every key in one JSON object on disk.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous document intact.
#[derive(Clone)]
pub struct FileStorage {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_document(&self) -> Result<Map<String, Value>, ChainError> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(persist_err)?
        {
            return Ok(Map::new());
        }
        let s = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(persist_err)?;
        if s.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&s).map_err(persist_err)? {
            Value::Object(map) => Ok(map),
            _ => Err(ChainError::PersistenceFailure(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    async fn write_document(&self, doc: &Map<String, Value>) -> Result<(), ChainError> {
        let data = serde_json::to_vec_pretty(doc).map_err(persist_err)?;
        let tmp = self.path.with_extension("tmp");
        let mut f = tokio::fs::File::create(&tmp).await.map_err(persist_err)?;
        f.write_all(&data).await.map_err(persist_err)?;
        f.flush().await.map_err(persist_err)?;
        drop(f);
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(persist_err)?;
        Ok(())
    }
}

#[async_trait]
impl ChainStorage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<Value>, ChainError> {
        let _guard = self.lock.lock().await;
        let doc = self.read_document().await?;
        Ok(doc.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), ChainError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_document().await?;
        doc.insert(key.to_string(), value);
        self.write_document(&doc).await
    }
}

/// In-process storage; contents live as long as the value does.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChainStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<Value>, ChainError> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), ChainError> {
        self.inner.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}
