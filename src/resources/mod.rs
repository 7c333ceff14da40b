//! Resource operations: trades, executions, comments and users.
//!
//! Each call follows the same shape: build the URL, attach a body or query
//! built only from fields the caller actually set, dispatch, interpret.
//! None of these calls retry.

pub mod comments;
pub mod executions;
pub mod trades;
pub mod users;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::error::{Result, TradervueError};
use crate::types::ResourceId;

pub use trades::{TradeDuration, TradeQuery, TradeSide};

/// Deserialize a response fragment, logging what failed to decode and where.
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str, url: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        error!(url, error = %e, "Unable to decode {what} from response");
        TradervueError::Decode(e)
    })
}

/// Pull the list stored under `key` out of a response envelope such as
/// `{"trades": [...]}`.
pub(crate) fn extract_list<T: DeserializeOwned>(
    payload: Option<Value>,
    key: &str,
    url: &str,
) -> Result<Vec<T>> {
    let list = payload
        .as_ref()
        .and_then(|p| p.get(key))
        .cloned();

    match list {
        Some(list) => decode(list, key, url),
        None => {
            let body = payload.map(|p| p.to_string()).unwrap_or_default();
            error!(url, body = %body, "No '{key}' field in query result");
            Err(TradervueError::ProtocolViolation(format!(
                "no '{key}' field in response from {url}"
            )))
        }
    }
}

/// Pull the `id` of a newly created resource out of a 201 body.
pub(crate) fn extract_id(payload: Option<Value>, what: &str, url: &str) -> Result<ResourceId> {
    let id = payload.as_ref().and_then(|p| p.get("id")).cloned();
    match id {
        Some(id) => decode(id, &format!("new {what} id"), url),
        None => {
            let body = payload.map(|p| p.to_string()).unwrap_or_default();
            error!(url, body = %body, "No 'id' in response creating {what}");
            Err(TradervueError::ProtocolViolation(format!(
                "no 'id' in response creating {what}"
            )))
        }
    }
}

/// The body of a single-object GET; an empty 200 is a contract break.
pub(crate) fn require_body(payload: Option<Value>, what: &str, url: &str) -> Result<Value> {
    payload.ok_or_else(|| {
        error!(url, "Empty response body querying {what}");
        TradervueError::ProtocolViolation(format!("empty body querying {what}"))
    })
}
