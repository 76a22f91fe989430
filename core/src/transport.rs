//! Blocking HTTP(S) transport backed by `ureq`.
//!
//! # Design
//! The transport is the only code that touches the network. It runs on the
//! executor's worker thread and turns one `RequestSpec` into either an
//! `HttpResponse` (any status code) or a `TransportError`.
//!
//! A fresh agent is built per request so `timeout_seconds` can bound the
//! whole exchange; connections are not pooled between requests. Bodies larger
//! than `TransportConfig::max_body_bytes` fail the request.

use std::time::Duration;

use ureq::config::Config;
use ureq::http::{self, HeaderMap};
use ureq::Agent;

use crate::error::TransportError;
use crate::http::{Headers, HttpResponse, RequestSpec};

pub const DEFAULT_USER_AGENT: &str = concat!("https-core/", env!("CARGO_PKG_VERSION"));

/// Limit applied to response bodies read into memory.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Something that can perform one request synchronously.
///
/// Called on a background thread, never while a handle lock is held.
pub trait Transport: Send + Sync {
    fn send(&self, spec: &RequestSpec) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&RequestSpec) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn send(&self, spec: &RequestSpec) -> Result<HttpResponse, TransportError> {
        self(spec)
    }
}

/// Settings shared by every request sent through a `UreqTransport`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub user_agent: String,
    pub max_body_bytes: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UreqTransport {
    config: TransportConfig,
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    fn agent(&self, timeout: Option<Duration>) -> Agent {
        Agent::new_with_config(
            Config::builder()
                .http_status_as_error(false)
                .timeout_global(timeout)
                .user_agent(self.config.user_agent.as_str())
                .build(),
        )
    }
}

impl Transport for UreqTransport {
    fn send(&self, spec: &RequestSpec) -> Result<HttpResponse, TransportError> {
        let mut builder = http::Request::builder()
            .method(spec.method.as_str())
            .uri(spec.url.as_str());
        for (key, value) in &spec.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let request = builder
            .body(spec.body.as_slice())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut response = self.agent(spec.timeout()).run(request)?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response
            .body_mut()
            .with_config()
            .limit(self.config.max_body_bytes)
            .read_to_vec()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Flatten a `HeaderMap` into a string map.
///
/// Repeated names are joined with `", "`. Values that are not valid UTF-8 are
/// dropped.
fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}
