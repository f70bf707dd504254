// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Shared test utilities to reduce duplication across test modules.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::error::ChainError;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};
use crate::record::{RequestRecord, ResponseRecord};
use crate::storage::ChainStorage;
use crate::store::Chain;

pub fn make_record(url: &str) -> RequestRecord {
    RequestRecord::new(url, None).expect("valid test url")
}

pub fn make_response(status: u16) -> ResponseRecord {
    ResponseRecord {
        status,
        headers: HashMap::from([("content-type".to_string(), "text/html".to_string())]),
        body: format!("<html>{}</html>", status),
    }
}

/// A chain of `n` distinct GET requests.
pub fn make_chain(name: &str, n: usize) -> Chain {
    let requests: Vec<_> = (0..n)
        .map(|i| make_record(&format!("example.com/{}/{}", name, i)))
        .collect();
    Chain::from_recording(name, &requests).expect("non-empty test chain")
}

/// Fetcher that answers 200 to everything except, optionally, one call.
pub struct ScriptedFetcher {
    fail_at: Option<usize>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn ok() -> Self {
        Self {
            fail_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail the call with this zero-based index.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, ChainError> {
        let mut calls = self.calls.lock().await;
        let index = calls.len();
        calls.push(req.url.clone());
        if self.fail_at == Some(index) {
            return Err(ChainError::FetchFailed("connection refused".into()));
        }
        Ok(FetchResponse {
            status: 200,
            headers: HashMap::new(),
            content: "ok".into(),
            url: req.url,
        })
    }
}

/// Fetcher whose every call panics, taking the calling task down with it.
pub struct PanickingFetcher;

#[async_trait]
impl Fetcher for PanickingFetcher {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, ChainError> {
        panic!("fetcher crashed on {}", req.url);
    }
}

/// Storage whose every operation fails.
pub struct FailingStorage;

#[async_trait]
impl ChainStorage for FailingStorage {
    async fn read(&self, _key: &str) -> Result<Option<Value>, ChainError> {
        Err(ChainError::PersistenceFailure("read refused".into()))
    }

    async fn write(&self, _key: &str, _value: Value) -> Result<(), ChainError> {
        Err(ChainError::PersistenceFailure("write refused".into()))
    }
}
