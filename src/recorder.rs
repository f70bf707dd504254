// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Recording state machine and the live buffer.

use tracing::{debug, info};

use crate::error::ChainError;
use crate::record::{RequestRecord, ResponseRecord};
use crate::store::{Chain, ChainStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

/// Owns the in-progress recording until it is saved into a chain.
#[derive(Debug)]
pub struct Recorder {
    state: RecorderState,
    buffer: Vec<RequestRecord>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Begin recording. Always resets the buffer, even when already recording.
    pub fn start(&mut self) {
        self.state = RecorderState::Recording;
        self.buffer.clear();
        info!("recording started");
    }

    /// Stop recording and return how many requests are buffered.
    pub fn stop(&mut self) -> usize {
        self.state = RecorderState::Idle;
        info!(requests = self.buffer.len(), "recording stopped");
        self.buffer.len()
    }

    /// Drop the buffered requests without touching the state.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Append a record while recording. Ignored while idle.
    pub fn capture(&mut self, record: RequestRecord) -> bool {
        if !self.is_recording() {
            debug!(url = %record.url, "capture ignored while idle");
            return false;
        }
        debug!(id = %record.id, url = %record.url, "captured request");
        self.buffer.push(record);
        true
    }

    /// Resolve the most recent buffered record with `id`.
    ///
    /// Returns false when no such record is buffered or it already has a
    /// response.
    pub fn attach_response(&mut self, id: &str, response: ResponseRecord) -> bool {
        match self.buffer.iter_mut().rev().find(|r| r.id == id) {
            Some(record) => record.resolve(response),
            None => {
                debug!(%id, "response for unknown request dropped");
                false
            }
        }
    }

    /// Save the buffer as a chain named `name`.
    ///
    /// The store is only touched on success; the buffer is cleared afterwards.
    pub async fn save(&mut self, name: &str, store: &mut ChainStore) -> Result<Chain, ChainError> {
        let chain = Chain::from_recording(name, &self.buffer)?;
        store.add(chain.clone()).await;
        self.buffer.clear();
        info!(id = %chain.id, name = %chain.name, requests = chain.len(), "chain saved");
        Ok(chain)
    }

    pub fn current_buffer(&self) -> &[RequestRecord] {
        &self.buffer
    }
}
