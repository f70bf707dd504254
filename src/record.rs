// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Captured request/response pairs that make up a recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ChainError;

pub const DEFAULT_METHOD: &str = "GET";

/// Response observed for a captured request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
}

/// One captured HTTP exchange.
///
/// `response` starts out empty and is resolved at most once.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub id: String,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseRecord>,
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

impl RequestRecord {
    /// Capture a new record. The URL is normalized before it is stored.
    pub fn new(url: &str, method: Option<&str>) -> Result<Self, ChainError> {
        let url = normalize_url(url)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            url,
            method: normalize_method(method),
            headers: None,
            body: None,
            timestamp: Utc::now(),
            response: None,
        })
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.response.is_some()
    }

    /// Attach the response. Returns false and leaves the record untouched if
    /// a response was already attached.
    pub fn resolve(&mut self, response: ResponseRecord) -> bool {
        if self.response.is_some() {
            return false;
        }
        self.response = Some(response);
        true
    }
}

/// GET and HEAD never carry a body.
pub fn method_allows_body(method: &str) -> bool {
    !(method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD"))
}

fn normalize_method(method: Option<&str>) -> String {
    match method.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_ascii_uppercase(),
        _ => default_method(),
    }
}

fn has_http_scheme(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Coerce user input into an absolute URL, prefixing `https://` when no
/// http(s) scheme is present.
///
/// The returned string is the prefixed input itself, not the parser's
/// serialization, so `example.com` becomes `https://example.com` without a
/// trailing slash.
pub fn normalize_url(input: &str) -> Result<String, ChainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ChainError::InvalidUrl("URL is required".into()));
    }

    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&candidate)
        .map_err(|e| ChainError::InvalidUrl(format!("{}: {}", candidate, e)))?;
    match parsed.host_str() {
        Some(h) if !h.is_empty() => Ok(candidate),
        _ => Err(ChainError::InvalidUrl(format!("{}: missing host", candidate))),
    }
}
