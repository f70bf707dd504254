// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! JSON-over-HTTP API exposing the proxy endpoint and the chain commands.

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::{service::service_fn, Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoConnBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::ChainError;
use crate::fetch::FetchRequest;
use crate::record::ResponseRecord;
use crate::replay::RunSummary;
use crate::service::ChainService;

type ApiResponse = Response<BoxBody<Bytes, Infallible>>;

type ServiceFuture = Pin<Box<dyn Future<Output = Result<ApiResponse, Infallible>> + Send>>;

pub async fn run_server(listen: SocketAddr, service: Arc<ChainService>) -> anyhow::Result<()> {
    run_server_with_limit(listen, service, None).await
}

/// Testable variant of `run_server` that accepts an optional `accept_limit`.
/// When `accept_limit` is `Some(n)`, the accept loop returns after accepting
/// the Nth connection. Connection handlers are spawned and may still be
/// running when this function returns.
pub async fn run_server_with_limit(
    listen: SocketAddr,
    service: Arc<ChainService>,
    accept_limit: Option<usize>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    serve(listener, service, accept_limit).await
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    service: Arc<ChainService>,
    accept_limit: Option<usize>,
) -> anyhow::Result<()> {
    info!(listen = %listener.local_addr()?, "listening");

    let server_builder = AutoConnBuilder::new(TokioExecutor::new());

    let mut remaining = accept_limit;
    loop {
        if let Some(0) = remaining {
            break;
        }

        let (stream, remote_addr) = listener.accept().await?;

        if let Some(ref mut n) = remaining {
            *n -= 1;
        }

        let service = service.clone();
        let builder = server_builder.clone();
        tokio::spawn(async move {
            debug!(%remote_addr, "connection accepted");
            let svc = service_fn(move |req: Request<Incoming>| {
                let service = service.clone();
                let fut: ServiceFuture = Box::pin(async move { handle_request(req, service).await });
                fut
            });

            let io = TokioIo::new(stream);
            if let Err(e) = builder.serve_connection(io, svc).await {
                error!(%e, "connection error");
            }
        });
    }

    Ok(())
}

#[derive(Deserialize)]
struct SaveChainBody {
    #[serde(default)]
    name: String,
}

pub async fn handle_request<B>(
    req: Request<B>,
    service: Arc<ChainService>,
) -> Result<ApiResponse, Infallible>
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let wait = query_flag(req.uri().query(), "wait");

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let boxed: Box<dyn std::error::Error + Send + Sync> = e.into();
            error!("failed to collect request body: {}", boxed);
            return Ok(json_response(500, json!({"error": "request body collect error"})));
        }
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    debug!(%method, %path, "api request");

    let resp = match (method.as_str(), segments.as_slice()) {
        ("POST", ["api", "proxy"]) => match parse_json::<FetchRequest>(&body) {
            Ok(fetch) => match service.proxy(fetch).await {
                Ok(resp) => json_response(200, to_value(&resp)),
                Err(e) => error_response(&e),
            },
            Err(resp) => resp,
        },
        ("POST", ["api", "navigate"]) => match parse_json::<FetchRequest>(&body) {
            Ok(fetch) => match service.navigate(fetch).await {
                Ok(record) => json_response(200, to_value(&record)),
                Err(e) => error_response(&e),
            },
            Err(resp) => resp,
        },
        ("GET", ["api", "recording"]) => json_response(
            200,
            json!({"isRecording": service.recording_status().await}),
        ),
        ("POST", ["api", "recording", "start"]) => {
            service.start_recording().await;
            json_response(200, json!({"success": true}))
        }
        ("POST", ["api", "recording", "stop"]) => {
            let count = service.stop_recording().await;
            json_response(200, json!({"success": true, "requestCount": count}))
        }
        ("POST", ["api", "recording", "clear"]) => {
            service.clear_recording().await;
            json_response(200, json!({"success": true}))
        }
        ("GET", ["api", "recording", "requests"]) => {
            json_response(200, json!({"chain": service.current_chain().await}))
        }
        ("POST", ["api", "recording", "requests"]) => match parse_json::<FetchRequest>(&body) {
            Ok(fetch) => match service.capture(fetch).await {
                Ok(Some(record)) => json_response(200, json!({"captured": true, "request": record})),
                Ok(None) => json_response(200, json!({"captured": false})),
                Err(e) => error_response(&e),
            },
            Err(resp) => resp,
        },
        ("POST", ["api", "recording", "requests", id, "response"]) => {
            match parse_json::<ResponseRecord>(&body) {
                Ok(response) => {
                    let attached = service.attach_response(id, response).await;
                    json_response(200, json!({"attached": attached}))
                }
                Err(resp) => resp,
            }
        }
        ("GET", ["api", "chains"]) => {
            json_response(200, json!({"chains": service.saved_chains().await}))
        }
        ("POST", ["api", "chains"]) => match parse_json::<SaveChainBody>(&body) {
            Ok(b) => match service.save_chain(&b.name).await {
                Ok(chain) => json_response(200, json!({"success": true, "chain": chain})),
                Err(e) => failure_response(&e),
            },
            Err(resp) => resp,
        },
        ("DELETE", ["api", "chains", id]) => match service.delete_chain(id).await {
            Ok(()) => json_response(200, json!({"success": true})),
            Err(e) => failure_response(&e),
        },
        ("POST", ["api", "chains", id, "run"]) => run_chain(&service, id, wait).await,
        ("GET", ["api", "history"]) => {
            json_response(200, json!({"history": service.history().await}))
        }
        ("GET", ["api", "history", id]) => match service.history_entry(id).await {
            Some(record) => json_response(200, to_value(&record)),
            None => json_response(404, json!({"error": format!("History entry not found: {}", id)})),
        },
        ("DELETE", ["api", "history"]) => {
            service.clear_history().await;
            json_response(200, json!({"success": true}))
        }
        (_, segs) if is_known_route(segs) => {
            json_response(405, json!({"error": "method not allowed"}))
        }
        _ => json_response(404, json!({"error": "not found"})),
    };

    Ok(resp)
}

async fn run_chain(service: &ChainService, id: &str, wait: bool) -> ApiResponse {
    if wait {
        return match service.run_chain_and_wait(id).await {
            Ok(RunSummary::Completed { request_count }) => json_response(
                200,
                json!({"success": true, "requestCount": request_count}),
            ),
            Ok(RunSummary::Failed { index, reason }) => json_response(
                500,
                json!({"success": false, "error": reason, "index": index}),
            ),
            Err(e) => failure_response(&e),
        };
    }

    match service.run_chain(id).await {
        Ok(rx) => {
            let id = id.to_string();
            tokio::spawn(async move {
                match rx.await {
                    Ok(report) => info!(chain = %id, summary = ?report.summary, "background chain run finished"),
                    Err(_) => warn!(chain = %id, "background chain run dropped"),
                }
            });
            json_response(202, json!({"accepted": true}))
        }
        Err(e) => failure_response(&e),
    }
}

fn is_known_route(segments: &[&str]) -> bool {
    matches!(
        segments,
        ["api", "proxy"]
            | ["api", "navigate"]
            | ["api", "recording"]
            | ["api", "recording", "start" | "stop" | "clear" | "requests"]
            | ["api", "recording", "requests", _, "response"]
            | ["api", "chains"]
            | ["api", "chains", _]
            | ["api", "chains", _, "run"]
            | ["api", "history"]
            | ["api", "history", _]
    )
}

fn query_flag(query: Option<&str>, name: &str) -> bool {
    query
        .unwrap_or("")
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .any(|(k, v)| k == name && (v == "true" || v == "1"))
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiResponse> {
    serde_json::from_slice(body).map_err(|e| {
        json_response(400, json!({"error": format!("invalid request body: {}", e)}))
    })
}

fn to_value<T: serde::Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

fn json_response(status: u16, value: Value) -> ApiResponse {
    let body = Bytes::from(value.to_string());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body.clone()).boxed())
        .unwrap_or_else(|e| {
            error!("failed to build response: {}", e);
            Response::new(Full::new(body).boxed())
        })
}

fn error_response(err: &ChainError) -> ApiResponse {
    json_response(err.status_code(), json!({"error": err.to_string()}))
}

fn failure_response(err: &ChainError) -> ApiResponse {
    json_response(
        err.status_code(),
        json!({"success": false, "error": err.to_string()}),
    )
}
