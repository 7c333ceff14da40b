//! Bulk execution import.
//!
//! An import runs in two phases:
//!
//! 1. **Submit** (`submit.rs`): POST the batch to `/imports`. HTTP 424 means
//!    the importer is still busy with a previous batch; that is retried after
//!    a fixed delay up to `import_retries` attempts in total. Anything else
//!    that is not `200 {"status": "queued"}` ends the import immediately.
//! 2. **Poll** (`poll.rs`, only with `wait_for_completion`): query
//!    `GET /imports` once, then re-query every `poll_interval` while the
//!    importer reports `queued`/`processing`, at most `wait_retries` more
//!    times.
//!
//! Every delay is a fixed constant; nothing backs off. Both loops run to
//! completion before the call returns.

mod poll;
mod submit;

use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::client::TradervueClient;
use crate::error::{Result, TradervueError};
use crate::types::{ImportBatch, ImportState};

pub use submit::BUSY_RETRY_DELAY;

const DEFAULT_IMPORT_RETRIES: u32 = 3;
const DEFAULT_WAIT_RETRIES: u32 = 3;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Retry and wait budgets for one import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Total POST attempts, including the first.
    pub import_retries: u32,
    pub wait_for_completion: bool,
    /// Status re-queries after the initial one.
    pub wait_retries: u32,
    pub poll_interval: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            import_retries: DEFAULT_IMPORT_RETRIES,
            wait_for_completion: false,
            wait_retries: DEFAULT_WAIT_RETRIES,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl ImportOptions {
    /// Poll the importer until it reports an outcome.
    pub fn waiting(mut self) -> Self {
        self.wait_for_completion = true;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.import_retries == 0 {
            return Err(TradervueError::Validation(
                "import_retries must allow at least 1 attempt".into(),
            ));
        }
        Ok(())
    }
}

/// How an import call ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Queued server-side; the caller did not ask to wait, so the final
    /// status is unknown.
    Submitted,
    Succeeded(ImportState),
    /// The importer finished but rejected some or all executions. The state
    /// carries the server's details.
    Failed(ImportState),
}

impl ImportOutcome {
    pub fn state(&self) -> Option<&ImportState> {
        match self {
            ImportOutcome::Submitted => None,
            ImportOutcome::Succeeded(s) | ImportOutcome::Failed(s) => Some(s),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Succeeded(_))
    }
}

impl TradervueClient {
    /// Submit `batch` to the importer and, if requested, wait for the result.
    ///
    /// Validation failures (empty batch, zero attempts) return before any
    /// request is made.
    #[instrument(parent = self.span(), skip_all, fields(wait = options.wait_for_completion))]
    pub async fn import_executions(
        &self,
        batch: ImportBatch,
        options: &ImportOptions,
    ) -> Result<ImportOutcome> {
        options.validate()?;
        let payload = batch.into_payload()?;
        let executions = payload.executions.len();
        let body = serde_json::to_value(&payload)?;

        self.submit_import(&body, options.import_retries).await?;
        info!(executions, "Import queued");

        if !options.wait_for_completion {
            return Ok(ImportOutcome::Submitted);
        }
        self.await_import(options.wait_retries, options.poll_interval)
            .await
    }

    /// `GET /imports`: the importer's current state.
    #[instrument(parent = self.span(), skip_all)]
    pub async fn import_status(&self) -> Result<ImportState> {
        let url = self.url(&["imports"]);
        let (resp, payload) = self
            .call(self.get(url), &[200], "Unable to query import status", false)
            .await?;
        let payload = payload.ok_or_else(|| {
            error!(url = %resp.url, "Empty import status response");
            TradervueError::ProtocolViolation("empty import status response".into())
        })?;

        debug!(body = %payload, "Queried import status");
        ImportState::from_value(payload).inspect_err(|e| match e {
            TradervueError::UnsupportedStatus(status) => error!(
                status = %status,
                "Unexpected status for import status. Check API and update library"
            ),
            other => error!(url = %resp.url, error = %other, "Malformed import status response"),
        })
    }
}
