//! HTTP transport.
//!
//! Defines the `Transport` trait the client dispatches through and the plain
//! request/response records that cross it. `http::ReqwestTransport` is the
//! production implementation; tests substitute scripted ones.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

pub use self::http::ReqwestTransport;

/// A fully resolved request: absolute URL, query pairs, optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw outcome of one HTTP exchange. Status codes are not judged here.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Final URL including the encoded query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Anything that can carry an `ApiRequest` to the server.
///
/// Authentication and fixed headers are the implementation's concern; the
/// client only supplies method, URL, query and body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse>;
}
