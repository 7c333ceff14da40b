//! Submission phase: POST the batch, retrying while the importer is busy.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::client::TradervueClient;
use crate::error::{Result, TradervueError};
use crate::response::{failure_reason, Interpretation};

/// Pause between attempts while the importer reports busy.
pub const BUSY_RETRY_DELAY: Duration = Duration::from_secs(5);

/// "Failed dependency": a previous import is still being processed.
const BUSY_STATUS: u16 = 424;

impl TradervueClient {
    /// Make up to `attempts` POSTs of `body` to `/imports`.
    ///
    /// Returns once the server answers `200 {"status": "queued"}`. A busy
    /// reply (424) sleeps `BUSY_RETRY_DELAY` when another attempt remains;
    /// every other reply ends submission at once.
    pub(crate) async fn submit_import(&self, body: &Value, attempts: u32) -> Result<()> {
        let url = self.url(&["imports"]);

        for attempt in 1..=attempts {
            let resp = self.dispatch(self.post(url.clone(), body.clone())).await?;

            if resp.status == BUSY_STATUS {
                let reason = failure_reason(&resp.body);
                if attempt < attempts {
                    warn!(
                        attempt,
                        attempts,
                        reason = %reason,
                        "Waiting {} seconds and retrying import",
                        BUSY_RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(BUSY_RETRY_DELAY).await;
                } else {
                    warn!(attempt, attempts, reason = %reason, "Importer still busy on final attempt");
                }
                continue;
            }

            return match self.interpret(&resp, &[200], "Unable to import executions", false) {
                Interpretation::Failure(failure) => Err(failure.into()),
                Interpretation::Empty => Err(TradervueError::ProtocolViolation(
                    "empty response to import request".into(),
                )),
                Interpretation::Success(payload) => {
                    let status = payload.get("status").and_then(Value::as_str);
                    if status == Some("queued") {
                        debug!(attempt, body = %payload, "Import request successful");
                        Ok(())
                    } else {
                        error!(
                            status = status.unwrap_or(""),
                            body = %payload,
                            "Unexpected status from importing executions"
                        );
                        Err(TradervueError::ProtocolViolation(format!(
                            "import request answered with status {} instead of 'queued'",
                            status.unwrap_or("<missing>")
                        )))
                    }
                }
            };
        }

        error!(attempts, "Unable to import executions after {attempts} attempts. Giving up.");
        Err(TradervueError::SubmissionExhausted { attempts })
    }
}
