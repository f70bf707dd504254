// SPDX-FileCopyrightText: 2026 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chain_recorder::config::Config;
use chain_recorder::server::serve;
use chain_recorder::service::ChainService;

pub fn make_temp_storage_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chain_integ_{}_{}.json", tag, uuid::Uuid::new_v4()))
}

/// Start the API server on an ephemeral port with file storage at `storage`
/// and no replay delay.
pub async fn start_server(
    storage: &Path,
) -> anyhow::Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let mut cfg = Config::default();
    cfg.general.storage = storage
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("storage path not utf8"))?
        .to_string();
    cfg.replay.delay_ms = 0;

    let service = Arc::new(ChainService::from_config(&cfg).await);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = serve(listener, service, None).await;
    });
    Ok((handle, addr))
}

/// Issue one JSON request against the API and decode the JSON answer.
pub async fn api_call(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: Option<serde_json::Value>,
) -> anyhow::Result<(u16, serde_json::Value)> {
    let client: Client<HttpConnector, Full<Bytes>> =
        Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    let payload = body.map(|v| v.to_string()).unwrap_or_default();
    let req = Request::builder()
        .method(method)
        .uri(format!("http://{}{}", addr, path))
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(payload)))?;
    let resp = client.request(req).await?;
    let status = resp.status().as_u16();
    let bytes = resp.into_body().collect().await?.to_bytes();
    Ok((status, serde_json::from_slice(&bytes)?))
}
