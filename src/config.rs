// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Configuration loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Listen address, e.g. 127.0.0.1:3000
    pub listen: String,

    /// Path of the JSON document holding saved chains
    pub storage: String,

    /// How many navigations the request history keeps
    pub history_limit: usize,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_storage() -> String {
    "chains.json".to_string()
}

fn default_history_limit() -> usize {
    100
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            storage: default_storage(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplayConfig {
    /// Pause between consecutive requests of a chain run
    pub delay_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            delay_ms: crate::replay::DEFAULT_REPLAY_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfig {
    /// User-Agent forced onto every outbound fetch
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::fetch::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub replay: ReplayConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// [general]
    /// listen = "127.0.0.1:3000"
    /// storage = "chains.json"
    ///
    /// [replay]
    /// delay_ms = 500
    pub async fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let s = tokio::fs::read_to_string(path.as_ref()).await?;
        let cfg: Self = toml::from_str(&s)?;
        Ok(cfg)
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.general.listen.parse()?)
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay.delay_ms)
    }
}
