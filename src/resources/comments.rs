//! Comments attached to a trade.

use tracing::{debug, instrument};

use super::extract_list;
use crate::client::TradervueClient;
use crate::error::Result;
use crate::types::{Comment, ResourceId};

impl TradervueClient {
    /// `GET /trades/{id}/comments`.
    #[instrument(parent = self.span(), skip_all)]
    pub async fn get_trade_comments(&self, trade_id: impl Into<ResourceId>) -> Result<Vec<Comment>> {
        let trade_id = trade_id.into();
        let url = self.url(&["trades", trade_id.as_str(), "comments"]);
        let (resp, payload) = self
            .call(
                self.get(url),
                &[200],
                &format!("Unable to query trade ID {trade_id} comments"),
                true,
            )
            .await?;

        let comments: Vec<Comment> = extract_list(payload, "comments", &resp.url)?;
        debug!(id = %trade_id, found = comments.len(), "Queried trade comments");
        Ok(comments)
    }
}
