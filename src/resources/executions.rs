//! Executions recorded against an existing trade.

use tracing::{debug, instrument};

use super::extract_list;
use crate::client::TradervueClient;
use crate::error::Result;
use crate::types::{Execution, ResourceId};

impl TradervueClient {
    /// `GET /trades/{id}/executions`.
    #[instrument(parent = self.span(), skip_all)]
    pub async fn get_trade_executions(&self, trade_id: impl Into<ResourceId>) -> Result<Vec<Execution>> {
        let trade_id = trade_id.into();
        let url = self.url(&["trades", trade_id.as_str(), "executions"]);
        let (resp, payload) = self
            .call(
                self.get(url),
                &[200],
                &format!("Unable to query trade ID {trade_id} executions"),
                true,
            )
            .await?;

        let executions: Vec<Execution> = extract_list(payload, "executions", &resp.url)?;
        debug!(id = %trade_id, found = executions.len(), "Queried trade executions");
        Ok(executions)
    }
}
