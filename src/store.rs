// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Saved chains and their persisted collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ChainError;
use crate::record::RequestRecord;
use crate::storage::ChainStorage;

/// Storage key the collection lives under.
pub const STORAGE_KEY: &str = "savedChains";

/// Version tag written with every persisted collection.
pub const STORAGE_VERSION: u32 = 1;

/// A named, ordered, immutable sequence of captured requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: String,
    pub name: String,
    pub requests: Vec<RequestRecord>,
    pub timestamp: DateTime<Utc>,
}

impl Chain {
    /// Snapshot a recording into a new chain.
    ///
    /// Fails with `EmptyChain` when there is nothing to save or the name is
    /// blank.
    pub fn from_recording(name: &str, requests: &[RequestRecord]) -> Result<Self, ChainError> {
        if requests.is_empty() || name.trim().is_empty() {
            return Err(ChainError::EmptyChain);
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            requests: requests.to_vec(),
            timestamp: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct PersistedChains {
    version: u32,
    chains: Vec<Chain>,
}

fn decode_blob(value: Value) -> Result<Vec<Chain>, ChainError> {
    let err = |e: serde_json::Error| ChainError::PersistenceFailure(e.to_string());
    match value {
        // Unversioned layout: a bare array of chains.
        Value::Array(_) => serde_json::from_value(value).map_err(err),
        other => {
            let persisted: PersistedChains = serde_json::from_value(other).map_err(err)?;
            if persisted.version > STORAGE_VERSION {
                return Err(ChainError::PersistenceFailure(format!(
                    "unsupported chain store version {}",
                    persisted.version
                )));
            }
            Ok(persisted.chains)
        }
    }
}

/// Ordered collection of saved chains backed by a `ChainStorage`.
///
/// A store whose persisted blob could not be read is read-only on disk: it
/// still works in memory but never writes over data it did not understand.
pub struct ChainStore {
    chains: Vec<Chain>,
    storage: Arc<dyn ChainStorage>,
    degraded: bool,
}

impl ChainStore {
    /// Read the collection once from storage.
    ///
    /// Missing data yields an empty store. Unreadable data is logged and
    /// yields an empty, degraded store that leaves the stored blob alone.
    pub async fn load(storage: Arc<dyn ChainStorage>) -> Self {
        let (chains, degraded) = match storage.read(STORAGE_KEY).await {
            Ok(Some(value)) => match decode_blob(value) {
                Ok(chains) => (chains, false),
                Err(e) => {
                    warn!(error = %e, "failed to decode saved chains, starting empty without persisting");
                    (Vec::new(), true)
                }
            },
            Ok(None) => (Vec::new(), false),
            Err(e) => {
                warn!(error = %e, "failed to read saved chains, starting empty without persisting");
                (Vec::new(), true)
            }
        };
        debug!(count = chains.len(), degraded, "loaded saved chains");
        Self {
            chains,
            storage,
            degraded,
        }
    }

    /// True when the stored blob was unreadable and writes are refused.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn list(&self) -> &[Chain] {
        &self.chains
    }

    pub fn get(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Append a chain and persist.
    pub async fn add(&mut self, chain: Chain) {
        self.chains.push(chain);
        self.persist_best_effort().await;
    }

    /// Remove the chain with `id`. Persists whether or not anything matched.
    pub async fn remove(&mut self, id: &str) -> Result<Chain, ChainError> {
        let pos = self.chains.iter().position(|c| c.id == id);
        let removed = pos.map(|i| self.chains.remove(i));
        self.persist_best_effort().await;
        removed.ok_or_else(|| ChainError::ChainNotFound(id.to_string()))
    }

    /// Write the whole collection to storage.
    ///
    /// Fails without writing when the store is degraded.
    pub async fn persist(&self) -> Result<(), ChainError> {
        if self.degraded {
            return Err(ChainError::PersistenceFailure(
                "saved chains could not be read at load; refusing to overwrite them".into(),
            ));
        }
        let blob = PersistedChains {
            version: STORAGE_VERSION,
            chains: self.chains.clone(),
        };
        let value = serde_json::to_value(&blob)
            .map_err(|e| ChainError::PersistenceFailure(e.to_string()))?;
        self.storage.write(STORAGE_KEY, value).await
    }

    // Callers of add/remove are not told about write failures.
    async fn persist_best_effort(&self) {
        if let Err(e) = self.persist().await {
            warn!(error = %e, count = self.chains.len(), "failed to persist saved chains");
        }
    }
}
