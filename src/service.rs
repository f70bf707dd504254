// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Command surface consumed by the presentation layer.
//!
//! One `ChainService` per process owns the recorder, the chain store and the
//! history. Locks are never held across a network fetch.

use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ChainError;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher, HttpFetcher};
use crate::history::RequestHistory;
use crate::record::{normalize_url, RequestRecord, ResponseRecord};
use crate::recorder::Recorder;
use crate::replay::{Replayer, RunReport, RunSummary};
use crate::storage::FileStorage;
use crate::store::{Chain, ChainStore};

pub struct ChainService {
    recorder: Mutex<Recorder>,
    store: Mutex<ChainStore>,
    history: Mutex<RequestHistory>,
    fetcher: Arc<dyn Fetcher>,
    replayer: Arc<Replayer>,
}

impl ChainService {
    pub fn new(
        store: ChainStore,
        fetcher: Arc<dyn Fetcher>,
        replayer: Replayer,
        history_limit: usize,
    ) -> Self {
        Self {
            recorder: Mutex::new(Recorder::new()),
            store: Mutex::new(store),
            history: Mutex::new(RequestHistory::new(history_limit)),
            fetcher,
            replayer: Arc::new(replayer),
        }
    }

    /// Wire the real fetcher and a file-backed store from configuration.
    pub async fn from_config(cfg: &Config) -> Self {
        let storage = Arc::new(FileStorage::new(&cfg.general.storage));
        let store = ChainStore::load(storage).await;
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(HttpFetcher::with_user_agent(cfg.proxy.user_agent.clone()));
        let replayer = Replayer::with_delay(fetcher.clone(), cfg.replay_delay());
        Self::new(store, fetcher, replayer, cfg.general.history_limit)
    }

    pub async fn start_recording(&self) {
        self.recorder.lock().await.start();
    }

    /// Returns the number of buffered requests.
    pub async fn stop_recording(&self) -> usize {
        self.recorder.lock().await.stop()
    }

    pub async fn clear_recording(&self) {
        self.recorder.lock().await.clear();
    }

    pub async fn recording_status(&self) -> bool {
        self.recorder.lock().await.is_recording()
    }

    pub async fn current_chain(&self) -> Vec<RequestRecord> {
        self.recorder.lock().await.current_buffer().to_vec()
    }

    pub async fn save_chain(&self, name: &str) -> Result<Chain, ChainError> {
        let mut recorder = self.recorder.lock().await;
        let mut store = self.store.lock().await;
        recorder.save(name, &mut store).await
    }

    pub async fn saved_chains(&self) -> Vec<Chain> {
        self.store.lock().await.list().to_vec()
    }

    pub async fn delete_chain(&self, id: &str) -> Result<(), ChainError> {
        let removed = self.store.lock().await.remove(id).await?;
        info!(id = %removed.id, name = %removed.name, "chain deleted");
        Ok(())
    }

    /// Start replaying the chain with `id` in the background.
    ///
    /// Unknown ids fail immediately; otherwise the receiver resolves once
    /// the run finishes.
    pub async fn run_chain(&self, id: &str) -> Result<oneshot::Receiver<RunReport>, ChainError> {
        let chain = self
            .store
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ChainError::ChainNotFound(id.to_string()))?;

        let (tx, rx) = oneshot::channel();
        let replayer = self.replayer.clone();
        tokio::spawn(async move {
            let report = replayer.run(&chain).await;
            if tx.send(report).is_err() {
                warn!(chain = %chain.id, "chain run finished with no one waiting");
            }
        });
        Ok(rx)
    }

    /// Run the chain and wait for it to finish.
    pub async fn run_chain_and_wait(&self, id: &str) -> Result<RunSummary, ChainError> {
        let rx = self.run_chain(id).await?;
        let report = rx
            .await
            .map_err(|_| ChainError::RunAborted(id.to_string()))?;
        Ok(report.summary)
    }

    /// Capture a request observed elsewhere. Returns the stored record when
    /// a recording is in progress.
    pub async fn capture(&self, req: FetchRequest) -> Result<Option<RequestRecord>, ChainError> {
        let record = record_from_request(&req)?;
        let captured = self.recorder.lock().await.capture(record.clone());
        Ok(captured.then_some(record))
    }

    pub async fn attach_response(&self, id: &str, response: ResponseRecord) -> bool {
        self.recorder.lock().await.attach_response(id, response)
    }

    /// Fetch through the proxy collaborator without recording anything.
    ///
    /// The URL is normalized here, so invalid input never reaches the
    /// collaborator.
    pub async fn proxy(&self, req: FetchRequest) -> Result<FetchResponse, ChainError> {
        let url = normalize_url(&req.url)?;
        self.fetcher.fetch(FetchRequest { url, ..req }).await
    }

    /// Navigate to a URL: capture it if recording, fetch it, attach the
    /// response, and log it in the history.
    ///
    /// A failed fetch leaves a captured record pending in the buffer.
    pub async fn navigate(&self, req: FetchRequest) -> Result<RequestRecord, ChainError> {
        let mut record = record_from_request(&req)?;
        let captured = self.recorder.lock().await.capture(record.clone());

        let resp = self.fetcher.fetch(FetchRequest::from(&record)).await?;
        let response = ResponseRecord::from(resp);

        if captured {
            self.recorder
                .lock()
                .await
                .attach_response(&record.id, response.clone());
        }
        record.resolve(response);
        self.history.lock().await.push(record.clone());
        Ok(record)
    }

    pub async fn history(&self) -> Vec<RequestRecord> {
        self.history.lock().await.to_vec()
    }

    pub async fn history_entry(&self, id: &str) -> Option<RequestRecord> {
        self.history.lock().await.get(id).cloned()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }
}

fn record_from_request(req: &FetchRequest) -> Result<RequestRecord, ChainError> {
    let mut record = RequestRecord::new(&req.url, Some(&req.method))?;
    if let Some(h) = &req.headers {
        record = record.with_headers(h.clone());
    }
    if let Some(b) = &req.body {
        record = record.with_body(b.clone());
    }
    Ok(record)
}
