//! Request and response data types.
//!
//! # Design
//! These types describe an HTTP exchange as plain owned data. The dispatcher
//! never looks inside a `RequestSpec` beyond handing it to a transport, so no
//! URL or method validation happens here; the transport reports malformed
//! input as a terminal error on the handle instead.
//!
//! Headers are a `BTreeMap` keyed exactly as supplied. Keys are neither
//! case-folded nor merged, so `"Accept"` and `"accept"` are two entries.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::HttpsError;

/// Header mapping used for both requests and responses.
pub type Headers = BTreeMap<String, String>;

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;

/// Everything a transport needs to perform one request.
///
/// Immutable once handed to the dispatcher; the executor thread takes
/// ownership of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub url: String,
    pub method: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub timeout_seconds: f64,
}

impl RequestSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: DEFAULT_METHOD.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Upper bound on the whole exchange, `None` meaning unbounded.
    ///
    /// Negative and NaN values fall back to the 30 second default. Values too
    /// large for a `Duration`, `+inf` included, leave the exchange unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        let seconds = self.timeout_seconds;
        if seconds.is_nan() || seconds < 0.0 {
            return Some(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS));
        }
        Duration::try_from_secs_f64(seconds).ok()
    }
}

/// A response as returned by a transport.
///
/// Any status the server sends is a response, including 4xx and 5xx.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Optional per-request settings, every field may be omitted.
///
/// This is the shape a binding layer receives from its host (an options
/// table, a JSON document). Missing fields take the `RequestSpec` defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequestOptions {
    pub method: Option<String>,
    pub headers: Headers,
    pub body: Option<String>,
    pub timeout: Option<f64>,
}

impl RequestOptions {
    pub fn from_json(json: &str) -> Result<Self, HttpsError> {
        serde_json::from_str(json).map_err(|e| HttpsError::InvalidOptions(e.to_string()))
    }

    pub fn into_spec(self, url: impl Into<String>) -> RequestSpec {
        let mut spec = RequestSpec::new(url).headers(self.headers);
        if let Some(method) = self.method {
            spec = spec.method(method);
        }
        if let Some(body) = self.body {
            spec = spec.body(body);
        }
        if let Some(timeout) = self.timeout {
            spec = spec.timeout_seconds(timeout);
        }
        spec
    }
}
