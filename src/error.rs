//! Error taxonomy for Tradervue API calls.
//!
//! HTTP failures are interpreted into values first (see `response`) and only
//! become a `TradervueError` once the calling operation decides to give up.
//! Validation errors are raised before any request is built.

use thiserror::Error;

use crate::types::ImportStatus;

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, TradervueError>;

#[derive(Debug, Error)]
pub enum TradervueError {
    /// Bad caller input. Never reaches the network.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// Any non-2xx response that is not retried.
    #[error("HTTP {status}: {reason}")]
    Http {
        status: u16,
        url: Option<String>,
        reason: String,
    },

    /// A well-formed response that breaks the documented API contract.
    #[error("unexpected server response: {0}")]
    ProtocolViolation(String),

    /// The server stayed busy (HTTP 424) for every submission attempt.
    #[error("import submission gave up after {attempts} attempts")]
    SubmissionExhausted { attempts: u32 },

    /// Polling ran out of retries while the import was still in flight.
    #[error("import still {last_status} after {queries} status queries")]
    PollTimeout {
        queries: u32,
        last_status: ImportStatus,
    },

    /// The importer went back to `ready` without reporting an outcome.
    #[error("importer reported ready without ever reporting success or failure")]
    NeverTerminal,

    #[error("unsupported import status '{0}'")]
    UnsupportedStatus(String),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl TradervueError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TradervueError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TradervueError::Validation(_))
    }
}
