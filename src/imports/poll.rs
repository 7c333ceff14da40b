//! Polling phase: watch `GET /imports` until the importer reports an outcome.

use std::time::Duration;
use tracing::{debug, error};

use super::ImportOutcome;
use crate::client::TradervueClient;
use crate::error::{Result, TradervueError};
use crate::types::ImportStatus;

impl TradervueClient {
    /// Query the status once, then up to `wait_retries` more times,
    /// `interval` apart, while the import is queued or processing.
    ///
    /// So at most `wait_retries + 1` queries and `wait_retries` sleeps.
    pub(crate) async fn await_import(&self, wait_retries: u32, interval: Duration) -> Result<ImportOutcome> {
        debug!("Waiting for import to complete...");

        let mut state = self.import_status().await?;
        let mut queries: u32 = 1;
        let mut retries_left = wait_retries;

        while state.status.is_in_flight() && retries_left > 0 {
            retries_left -= 1;
            tokio::time::sleep(interval).await;
            state = self.import_status().await?;
            queries += 1;
            debug!(queries, status = %state.status, "Polled import status");
        }

        match state.status {
            ImportStatus::Succeeded => {
                debug!(queries, "Import was successful");
                Ok(ImportOutcome::Succeeded(state))
            }
            ImportStatus::Failed => {
                error!(details = ?state.details, "Import had some failures");
                Ok(ImportOutcome::Failed(state))
            }
            ImportStatus::Ready => {
                error!("Found importer in ready state, but never saw success/failure");
                Err(TradervueError::NeverTerminal)
            }
            ImportStatus::Queued | ImportStatus::Processing => {
                error!(
                    queries,
                    status = %state.status,
                    "Import is still being processed after {queries} attempts to query status. Giving up"
                );
                Err(TradervueError::PollTimeout {
                    queries,
                    last_status: state.status,
                })
            }
        }
    }
}
