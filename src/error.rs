// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Error taxonomy shared by the recorder, store, replayer and fetcher.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Input could not be coerced into an absolute URL.
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// Method or header names the transport refuses to send.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fetch URL: {0}")]
    FetchFailed(String),

    /// Save attempted with an empty recording or a blank name.
    #[error("No requests in current chain")]
    EmptyChain,

    #[error("Chain not found: {0}")]
    ChainNotFound(String),

    #[error("Chain run failed at request {index}: {reason}")]
    ChainRunFailed { index: usize, reason: String },

    /// The replay task ended without producing a report.
    #[error("Chain run aborted: {0}")]
    RunAborted(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl ChainError {
    /// HTTP status the API server answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ChainError::InvalidUrl(_) | ChainError::InvalidRequest(_) | ChainError::EmptyChain => {
                400
            }
            ChainError::ChainNotFound(_) => 404,
            ChainError::FetchFailed(_)
            | ChainError::ChainRunFailed { .. }
            | ChainError::RunAborted(_)
            | ChainError::PersistenceFailure(_) => 500,
        }
    }
}
