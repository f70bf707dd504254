// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Request chain recorder: capture outgoing navigations into an ordered
//! recording, persist named chains, and replay them through a simple HTTP
//! proxy.
//!
//! The library holds the recorder, chain store, replayer and fetcher; the
//! `server` module exposes them over HTTP and main.rs is the binary
//! entrypoint.

pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod record;
pub mod recorder;
pub mod replay;
pub mod server;
pub mod service;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_helpers;

pub use error::ChainError;
