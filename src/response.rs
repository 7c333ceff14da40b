//! Response interpretation.
//!
//! Turns a `RawResponse` into success payload, empty success, or a structured
//! failure. Failures are logged here (status, optional URL, server reason) and
//! handed back as values; the calling operation decides what happens next.

use serde_json::Value;
use tracing::{error, warn};

use crate::error::TradervueError;
use crate::transport::RawResponse;

/// Outcome of interpreting one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// Expected status with a body. Bodies that are not JSON arrive as
    /// `Value::String` holding the raw text.
    Success(Value),
    /// Expected status with an empty body.
    Empty,
    Failure(HttpFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
    pub status: u16,
    pub url: Option<String>,
    pub reason: String,
}

impl From<HttpFailure> for TradervueError {
    fn from(f: HttpFailure) -> Self {
        TradervueError::Http {
            status: f.status,
            url: f.url,
            reason: f.reason,
        }
    }
}

impl Interpretation {
    /// Collapse into a `Result`, mapping `Empty` to `None`.
    pub fn into_result(self) -> Result<Option<Value>, TradervueError> {
        match self {
            Interpretation::Success(v) => Ok(Some(v)),
            Interpretation::Empty => Ok(None),
            Interpretation::Failure(f) => Err(f.into()),
        }
    }
}

/// Classifies responses for one client; knows the impersonation target so
/// permission failures can say who was being impersonated.
#[derive(Debug, Clone, Default)]
pub struct ResponseInterpreter {
    target_user: Option<String>,
}

impl ResponseInterpreter {
    pub fn new(target_user: Option<String>) -> Self {
        Self { target_user }
    }

    /// Interpret `resp`, treating any status in `expected` as success.
    ///
    /// `action` describes the call for the failure log ("Unable to query
    /// trades"); `show_url` adds the request URL to it.
    pub fn interpret(
        &self,
        resp: &RawResponse,
        expected: &[u16],
        action: &str,
        show_url: bool,
    ) -> Interpretation {
        if expected.contains(&resp.status) {
            if resp.body.trim().is_empty() {
                return Interpretation::Empty;
            }
            let payload = serde_json::from_str(&resp.body)
                .unwrap_or_else(|_| Value::String(resp.body.clone()));
            return Interpretation::Success(payload);
        }

        let failure = HttpFailure {
            status: resp.status,
            url: show_url.then(|| resp.url.clone()),
            reason: failure_reason(&resp.body),
        };

        error!(
            status = failure.status,
            url = failure.url.as_deref().unwrap_or(""),
            reason = %failure.reason,
            "{action}"
        );

        if failure.status == 403 {
            if let Some(ref target) = self.target_user {
                error!(
                    target_user = %target,
                    "No permission to issue API calls on behalf of user {target}"
                );
            }
        }

        Interpretation::Failure(failure)
    }
}

/// Derive a human-readable reason from an error body: the `error` field, else
/// the `status` field, else the raw text.
pub fn failure_reason(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    for key in ["error", "status"] {
        if let Some(v) = json.get(key) {
            return match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
    }

    warn!("Unexpected JSON received for bad HTTP response (no status or error field found)");
    body.to_string()
}
