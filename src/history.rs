// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Bounded log of every navigation, recorded or not.

use std::collections::VecDeque;

use crate::record::RequestRecord;

/// Navigation history, ordered **newest first**.
///
/// Independent of the recorder: entries land here whether or not a
/// recording is in progress.
#[derive(Debug, Clone)]
pub struct RequestHistory {
    entries: VecDeque<RequestRecord>,
    limit: usize,
}

impl RequestHistory {
    /// A `limit` of zero keeps nothing.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Push to the front, evicting the oldest entry past the limit.
    pub fn push(&mut self, record: RequestRecord) {
        if self.limit == 0 {
            return;
        }
        self.entries.push_front(record);
        while self.entries.len() > self.limit {
            self.entries.pop_back();
        }
    }

    pub fn get(&self, id: &str) -> Option<&RequestRecord> {
        self.entries.iter().find(|r| r.id == id)
    }

    pub fn to_vec(&self) -> Vec<RequestRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
