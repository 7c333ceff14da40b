//! Tradervue API client.
//!
//! `TradervueClient` owns a transport, the resolved API base URL and the
//! tracing span its calls log under. It keeps no server state between calls;
//! every operation builds a request, dispatches it, and interprets the reply.
//!
//! Resource operations live in `crate::resources`, the import workflow in
//! `crate::imports`; both are `impl TradervueClient` blocks built on the
//! helpers here.

use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info_span, Span};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::response::{Interpretation, ResponseInterpreter};
use crate::transport::{ApiRequest, RawResponse, ReqwestTransport, Transport};
use crate::types::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://www.tradervue.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path appended to the host for every endpoint.
const API_PATH: &str = "api/v1";

pub struct TradervueClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    interpreter: ResponseInterpreter,
    span: Span,
}

impl TradervueClient {
    /// Client against the public Tradervue host.
    pub fn new(credentials: Credentials) -> anyhow::Result<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL, false)
    }

    /// Client against an arbitrary host (staging, self-hosted proxies).
    pub fn with_base_url(
        credentials: Credentials,
        base_url: &str,
        verbose_http: bool,
    ) -> anyhow::Result<Self> {
        Self::build(credentials, base_url, verbose_http, DEFAULT_TIMEOUT)
    }

    /// Client configured from the `[client]` table of `tradervue.toml`.
    pub fn from_config(config: &ClientConfig, credentials: Credentials) -> anyhow::Result<Self> {
        Self::build(
            credentials,
            &config.base_url,
            config.verbose_http,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn build(
        credentials: Credentials,
        base_url: &str,
        verbose_http: bool,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let span = info_span!(
            "tradervue",
            user = %credentials.username,
            target_user = credentials.target_user.as_deref().unwrap_or("")
        );
        let target_user = credentials.target_user.clone();
        let transport = ReqwestTransport::with_timeout(credentials, verbose_http, timeout)?;
        Ok(Self::with_transport(Arc::new(transport), base_url, target_user).with_span(span))
    }

    /// Client over any transport. `target_user` only feeds the permission
    /// hint on 403s; the transport is responsible for sending the header.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        base_url: &str,
        target_user: Option<String>,
    ) -> Self {
        let base_url = format!("{}/{API_PATH}", base_url.trim_end_matches('/'));
        let span = info_span!(
            "tradervue",
            target_user = target_user.as_deref().unwrap_or("")
        );
        Self {
            transport,
            base_url,
            interpreter: ResponseInterpreter::new(target_user),
            span,
        }
    }

    /// Replace the span every call is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parent of the span each public operation runs under.
    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    // -- Internal helpers ------------------------------------------------

    /// `{base}/{segments...}` with every segment percent-encoded.
    pub(crate) fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// Send one request through the transport. Transport faults (connect,
    /// timeout, unreadable body) are logged here with the request URL.
    pub(crate) async fn dispatch(&self, request: ApiRequest) -> Result<RawResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        let resp = self.transport.send(request).await.inspect_err(|e| {
            error!(method = %method, url = %url, error = %format!("{e:#}"), "Tradervue request failed");
        })?;
        Ok(resp)
    }

    pub(crate) fn interpret(
        &self,
        resp: &RawResponse,
        expected: &[u16],
        action: &str,
        show_url: bool,
    ) -> Interpretation {
        self.interpreter.interpret(resp, expected, action, show_url)
    }

    /// Dispatch and interpret in one go; failures become `TradervueError::Http`.
    pub(crate) async fn call(
        &self,
        request: ApiRequest,
        expected: &[u16],
        action: &str,
        show_url: bool,
    ) -> Result<(RawResponse, Option<Value>)> {
        let resp = self.dispatch(request).await?;
        let payload = self.interpret(&resp, expected, action, show_url).into_result()?;
        Ok((resp, payload))
    }

    pub(crate) fn get(&self, url: String) -> ApiRequest {
        ApiRequest::new(Method::GET, url)
    }

    pub(crate) fn post(&self, url: String, body: Value) -> ApiRequest {
        ApiRequest::new(Method::POST, url).with_body(body)
    }

    pub(crate) fn put(&self, url: String, body: Value) -> ApiRequest {
        ApiRequest::new(Method::PUT, url).with_body(body)
    }

    pub(crate) fn delete(&self, url: String) -> ApiRequest {
        ApiRequest::new(Method::DELETE, url)
    }
}
