//! reqwest-backed transport.
//!
//! Every request carries HTTP basic auth, `Accept`/`Content-Type:
//! application/json`, the caller's user agent and, when impersonating, the
//! `Tradervue-UserId` header. With `verbose` set, full request and response
//! dumps are logged at DEBUG. Neither the client password nor any
//! `password` field inside a request body is ever written to the log.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ApiRequest, RawResponse, Transport};
use crate::types::Credentials;

/// Header naming the account to act on behalf of.
pub const TARGET_USER_HEADER: &str = "Tradervue-UserId";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Body fields never written to the verbose request dump.
const SECRET_FIELDS: &[&str] = &["password"];

const REDACTED: &str = "<redacted>";

/// Copy of `body` with every secret field, at any depth, masked.
pub(crate) fn redact_secrets(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if SECRET_FIELDS.contains(&k.as_str()) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_secrets(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_secrets).collect()),
        other => other.clone(),
    }
}

pub struct ReqwestTransport {
    http: Client,
    credentials: Credentials,
    verbose: bool,
}

impl ReqwestTransport {
    pub fn new(credentials: Credentials, verbose: bool) -> Result<Self> {
        Self::with_timeout(credentials, verbose, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(credentials: Credentials, verbose: bool, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref target) = credentials.target_user {
            let value = HeaderValue::from_str(target)
                .with_context(|| format!("Invalid target user id for header: {target}"))?;
            let name = HeaderName::from_bytes(TARGET_USER_HEADER.as_bytes())
                .context("Invalid target user header name")?;
            headers.insert(name, value);
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(credentials.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client for Tradervue")?;

        Ok(Self {
            http,
            credentials,
            verbose,
        })
    }

    pub fn target_user(&self) -> Option<&str> {
        self.credentials.target_user.as_deref()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        if self.verbose {
            debug!(
                method = %request.method,
                url = %request.url,
                user_agent = %self.credentials.user_agent,
                target_user = ?self.credentials.target_user,
                user = %self.credentials.username,
                payload = ?request.body.as_ref().map(redact_secrets),
                params = ?request.query,
                "REQUEST"
            );
        }

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .basic_auth(
                &self.credentials.username,
                Some(self.credentials.password.expose_secret()),
            );
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .with_context(|| format!("Tradervue {} {} request failed", request.method, request.url))?;

        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read Tradervue response body from {url}"))?;

        let raw = RawResponse {
            status,
            url,
            headers,
            body,
        };

        if self.verbose {
            debug!(
                url = %raw.url,
                code = raw.status,
                headers = ?raw.headers,
                body = %raw.body,
                "RESPONSE"
            );
        }

        Ok(raw)
    }
}
