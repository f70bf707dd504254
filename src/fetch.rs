// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Outbound fetches on behalf of the recorder and replayer.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderMap, USER_AGENT};
use hyper::{Method, Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::ChainError;
use crate::record::{method_allows_body, normalize_url, RequestRecord, ResponseRecord};

/// Pretend-browser string sent with every fetch.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_method() -> String {
    crate::record::DEFAULT_METHOD.to_string()
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: None,
            body: None,
        }
    }
}

impl From<&RequestRecord> for FetchRequest {
    fn from(r: &RequestRecord) -> Self {
        Self {
            url: r.url.clone(),
            method: r.method.clone(),
            headers: r.headers.clone(),
            body: r.body.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub content: String,
    /// The normalized URL that was actually requested.
    pub url: String,
}

impl From<FetchResponse> for ResponseRecord {
    fn from(r: FetchResponse) -> Self {
        Self {
            status: r.status,
            headers: r.headers,
            body: r.content,
        }
    }
}

/// Performs one HTTP exchange.
///
/// Any upstream status counts as success; only unusable input and transport
/// failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, ChainError>;
}

type HttpsClient = LegacyClient<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// `Fetcher` backed by a pooled hyper client (HTTP/1 and HTTP/2). TLS uses
/// the platform roots, or the bundled webpki roots when none are found.
#[derive(Clone)]
pub struct HttpFetcher {
    client: HttpsClient,
    user_agent: String,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        let builder = match HttpsConnectorBuilder::new().with_native_roots() {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "native root certificates unavailable, using bundled roots");
                HttpsConnectorBuilder::new().with_webpki_roots()
            }
        };
        let https = builder
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client: HttpsClient = LegacyClient::builder(TokioExecutor::new()).build(https);
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }

    fn build_request(
        &self,
        req: &FetchRequest,
    ) -> Result<(String, Request<Full<Bytes>>), ChainError> {
        let url = normalize_url(&req.url)?;
        // The parser lowercases scheme and host, which the connector requires.
        let wire = url::Url::parse(&url).map_err(|e| ChainError::InvalidUrl(e.to_string()))?;
        let uri: Uri = wire
            .as_str()
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| ChainError::InvalidUrl(e.to_string()))?;

        let method = Method::from_bytes(req.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| ChainError::InvalidRequest(e.to_string()))?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if let Some(headers) = &req.headers {
            for (name, value) in headers {
                if name.eq_ignore_ascii_case(USER_AGENT.as_str()) {
                    continue;
                }
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder = builder.header(USER_AGENT, self.user_agent.as_str());

        let body = match &req.body {
            Some(b) if method_allows_body(method.as_str()) => Bytes::from(b.clone()),
            _ => Bytes::new(),
        };

        let request = builder
            .body(Full::new(body))
            .map_err(|e| ChainError::InvalidRequest(e.to_string()))?;
        Ok((url, request))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, ChainError> {
        let (url, request) = self.build_request(&req)?;
        debug!(method = %request.method(), %url, "fetching");

        let resp = self.client.request(request).await.map_err(|e| {
            warn!(%url, error = %e, "fetch failed");
            ChainError::FetchFailed(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let headers = headers_to_map(resp.headers());
        let bytes = match resp.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(%url, error = %e, "failed to read response body");
                return Err(ChainError::FetchFailed(e.to_string()));
            }
        };

        Ok(FetchResponse {
            status,
            headers,
            content: String::from_utf8_lossy(&bytes).into_owned(),
            url,
        })
    }
}

/// Non-UTF-8 header values are dropped.
pub fn headers_to_map(h: &HeaderMap) -> HashMap<String, String> {
    let mut m = HashMap::new();
    for (k, v) in h.iter() {
        if let Ok(s) = v.to_str() {
            m.insert(k.as_str().to_string(), s.to_string());
        }
    }
    m
}
