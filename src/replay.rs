// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Sequential, fail-fast replay of a saved chain.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::ChainError;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};
use crate::store::Chain;

/// Pause between consecutive requests of a run.
pub const DEFAULT_REPLAY_DELAY: Duration = Duration::from_millis(500);

/// Outcome of a whole run, without the observed responses.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RunSummary {
    #[serde(rename_all = "camelCase")]
    Completed { request_count: usize },
    #[serde(rename_all = "camelCase")]
    Failed { index: usize, reason: String },
}

/// Outcome of a run plus the responses observed along the way.
///
/// Responses are never written back into the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub chain_id: String,
    pub summary: RunSummary,
    pub responses: Vec<FetchResponse>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        matches!(self.summary, RunSummary::Completed { .. })
    }

    pub fn into_result(self) -> Result<usize, ChainError> {
        match self.summary {
            RunSummary::Completed { request_count } => Ok(request_count),
            RunSummary::Failed { index, reason } => Err(ChainError::ChainRunFailed { index, reason }),
        }
    }
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Started { chain_id: String, total: usize },
    RequestCompleted { index: usize, status: u16 },
    Finished(RunSummary),
}

pub struct Replayer {
    fetcher: Arc<dyn Fetcher>,
    delay: Duration,
}

impl Replayer {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_delay(fetcher, DEFAULT_REPLAY_DELAY)
    }

    pub fn with_delay(fetcher: Arc<dyn Fetcher>, delay: Duration) -> Self {
        Self { fetcher, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn run(&self, chain: &Chain) -> RunReport {
        self.run_with_events(chain, None).await
    }

    /// Re-issue every request of `chain` in order.
    ///
    /// The first failing fetch aborts the run. The delay is applied between
    /// requests only, never after the last one.
    pub async fn run_with_events(
        &self,
        chain: &Chain,
        events: Option<mpsc::Sender<RunEvent>>,
    ) -> RunReport {
        let total = chain.requests.len();
        info!(chain = %chain.id, name = %chain.name, total, "running chain");
        emit(
            &events,
            RunEvent::Started {
                chain_id: chain.id.clone(),
                total,
            },
        )
        .await;

        let mut responses = Vec::with_capacity(total);
        for (index, record) in chain.requests.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.fetcher.fetch(FetchRequest::from(record)).await {
                Ok(resp) => {
                    emit(
                        &events,
                        RunEvent::RequestCompleted {
                            index,
                            status: resp.status,
                        },
                    )
                    .await;
                    responses.push(resp);
                }
                Err(e) => {
                    warn!(chain = %chain.id, index, url = %record.url, error = %e, "chain run failed");
                    let summary = RunSummary::Failed {
                        index,
                        reason: e.to_string(),
                    };
                    emit(&events, RunEvent::Finished(summary.clone())).await;
                    return RunReport {
                        chain_id: chain.id.clone(),
                        summary,
                        responses,
                    };
                }
            }
        }

        info!(chain = %chain.id, total, "chain run completed");
        let summary = RunSummary::Completed {
            request_count: total,
        };
        emit(&events, RunEvent::Finished(summary.clone())).await;
        RunReport {
            chain_id: chain.id.clone(),
            summary,
            responses,
        }
    }
}

// A dropped receiver only means nobody is watching.
async fn emit(events: &Option<mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
