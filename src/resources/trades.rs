//! Trade CRUD and the paginated, filtered trade listing.

use chrono::NaiveDate;
use std::str::FromStr;
use tracing::{debug, error, instrument, warn};

use super::{decode, extract_id, extract_list, require_body};
use crate::client::TradervueClient;
use crate::error::{Result, TradervueError};
use crate::types::{NewTrade, ResourceId, Trade, TradeUpdate};

/// The server caps `count` at this many trades per page.
pub const PAGE_SIZE: u32 = 100;

const DEFAULT_MAX_TRADES: u32 = 25;

/// Filter dates are sent US-style.
const FILTER_DATE_FORMAT: &str = "%m/%d/%Y";

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    /// Single-letter code used by the query string.
    pub fn code(self) -> &'static str {
        match self {
            TradeSide::Long => "L",
            TradeSide::Short => "S",
        }
    }
}

impl FromStr for TradeSide {
    type Err = TradervueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(TradeSide::Long),
            "short" => Ok(TradeSide::Short),
            _ => Err(TradervueError::Validation(format!(
                "the 'side' filter must be 'Long' or 'Short'. Saw '{s}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDuration {
    Intraday,
    Multiday,
}

impl TradeDuration {
    pub fn code(self) -> &'static str {
        match self {
            TradeDuration::Intraday => "I",
            TradeDuration::Multiday => "M",
        }
    }
}

impl FromStr for TradeDuration {
    type Err = TradervueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "intraday" => Ok(TradeDuration::Intraday),
            "multiday" => Ok(TradeDuration::Multiday),
            _ => Err(TradervueError::Validation(format!(
                "the 'duration' filter must be 'Intraday' or 'Multiday'. Saw '{s}'"
            ))),
        }
    }
}

/// Filters for `GET /trades`. Unset filters are left out of the query.
#[derive(Debug, Clone)]
pub struct TradeQuery {
    pub symbol: Option<String>,
    /// Tag expression; boolean operators must be uppercase (`AND`, `OR`).
    pub tag_expr: Option<String>,
    /// "long" / "short", any case.
    pub side: Option<String>,
    /// "intraday" / "multiday", any case.
    pub duration: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_trades: u32,
}

impl Default for TradeQuery {
    fn default() -> Self {
        Self {
            symbol: None,
            tag_expr: None,
            side: None,
            duration: None,
            start_date: None,
            end_date: None,
            max_trades: DEFAULT_MAX_TRADES,
        }
    }
}

impl TradeQuery {
    /// Validate and render the filter part of the query string.
    pub fn filter_params(&self) -> Result<Vec<(String, String)>> {
        if self.max_trades == 0 {
            return Err(TradervueError::Validation("max_trades must be at least 1".into()));
        }

        let mut params = Vec::new();
        if let Some(ref symbol) = self.symbol {
            params.push(("symbol".to_string(), symbol.clone()));
        }
        if let Some(ref tag) = self.tag_expr {
            params.push(("tag".to_string(), tag.clone()));
        }
        if let Some(ref side) = self.side {
            params.push(("side".to_string(), side.parse::<TradeSide>()?.code().to_string()));
        }
        if let Some(ref duration) = self.duration {
            params.push((
                "duration".to_string(),
                duration.parse::<TradeDuration>()?.code().to_string(),
            ));
        }
        if let Some(start) = self.start_date {
            params.push(("startdate".to_string(), start.format(FILTER_DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("enddate".to_string(), end.format(FILTER_DATE_FORMAT).to_string()));
        }
        Ok(params)
    }

    /// Number of pages needed to collect `max_trades`.
    pub fn page_count(&self) -> u32 {
        if self.max_trades > PAGE_SIZE {
            self.max_trades.div_ceil(PAGE_SIZE)
        } else {
            1
        }
    }

    /// True when the tag expression uses lowercase `and`/`or` between terms,
    /// which the server reads as tag names rather than operators.
    pub fn has_lowercase_operator(&self) -> bool {
        let Some(ref expr) = self.tag_expr else {
            return false;
        };
        let words: Vec<&str> = expr.split_whitespace().collect();
        words.len() > 2
            && words[1..words.len() - 1]
                .iter()
                .any(|w| *w == "and" || *w == "or")
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl TradervueClient {
    /// Create a trade and return its id.
    #[instrument(parent = self.span(), skip_all, fields(symbol = %trade.symbol))]
    pub async fn create_trade(&self, trade: &NewTrade) -> Result<ResourceId> {
        let url = self.url(&["trades"]);
        let (resp, payload) = self
            .call(
                self.post(url, serde_json::to_value(trade)?),
                &[201],
                &format!("New trade creation for {}", trade.symbol),
                false,
            )
            .await?;
        let id = extract_id(payload, "trade", &resp.url)?;
        debug!(symbol = %trade.symbol, id = %id, "Created new trade");
        Ok(id)
    }

    /// Create a trade and return the `Location` of the new resource.
    #[instrument(parent = self.span(), skip_all, fields(symbol = %trade.symbol))]
    pub async fn create_trade_location(&self, trade: &NewTrade) -> Result<String> {
        let url = self.url(&["trades"]);
        let (resp, _) = self
            .call(
                self.post(url, serde_json::to_value(trade)?),
                &[201],
                &format!("New trade creation for {}", trade.symbol),
                false,
            )
            .await?;
        let location = resp.header("Location").ok_or_else(|| {
            error!(url = %resp.url, "No Location header on created trade");
            TradervueError::ProtocolViolation("no Location header on created trade".into())
        })?;
        debug!(symbol = %trade.symbol, location, "Created new trade");
        Ok(location.to_string())
    }

    #[instrument(parent = self.span(), skip_all)]
    pub async fn delete_trade(&self, trade_id: impl Into<ResourceId>) -> Result<()> {
        let trade_id = trade_id.into();
        let url = self.url(&["trades", trade_id.as_str()]);
        self.call(
            self.delete(url),
            &[200],
            &format!("Deletion of trade ID {trade_id}"),
            false,
        )
        .await?;
        debug!(id = %trade_id, "Deleted trade");
        Ok(())
    }

    /// Delete several trades one after another. A failure on one id does not
    /// stop the rest; results line up with `trade_ids`.
    #[instrument(parent = self.span(), skip_all, fields(count = trade_ids.len()))]
    pub async fn delete_trades(&self, trade_ids: &[ResourceId]) -> Vec<Result<()>> {
        let mut results = Vec::with_capacity(trade_ids.len());
        for id in trade_ids {
            let result = self.delete_trade(id.clone()).await;
            if let Err(ref e) = result {
                error!(id = %id, error = %e, "Unable to delete trade");
            }
            results.push(result);
        }
        results
    }

    #[instrument(parent = self.span(), skip_all)]
    pub async fn get_trade(&self, trade_id: impl Into<ResourceId>) -> Result<Trade> {
        let trade_id = trade_id.into();
        let url = self.url(&["trades", trade_id.as_str()]);
        let (resp, payload) = self
            .call(
                self.get(url),
                &[200],
                &format!("Unable to query trade ID {trade_id}"),
                true,
            )
            .await?;
        let payload = require_body(payload, &format!("trade ID {trade_id}"), &resp.url)?;
        debug!(id = %trade_id, "Queried trade");
        decode(payload, "trade", &resp.url)
    }

    /// Update the fields set in `update`.
    ///
    /// Returns `Ok(false)` without contacting the server when nothing is set.
    #[instrument(parent = self.span(), skip_all)]
    pub async fn update_trade(&self, trade_id: impl Into<ResourceId>, update: &TradeUpdate) -> Result<bool> {
        let trade_id = trade_id.into();
        if update.is_empty() {
            warn!(id = %trade_id, "No updates specified for trade. Not taking further action");
            return Ok(false);
        }

        let fields = update.field_names().join(" ");
        let url = self.url(&["trades", trade_id.as_str()]);
        self.call(
            self.put(url, serde_json::to_value(update)?),
            &[200],
            &format!("Unable to update fields [{fields}] of trade ID {trade_id}"),
            false,
        )
        .await?;
        debug!(id = %trade_id, fields = %fields, "Updated trade");
        Ok(true)
    }

    /// Collect up to `query.max_trades` trades, page by page.
    ///
    /// Stops early on an empty page. Any failing page fails the whole
    /// listing; partial results are discarded.
    #[instrument(parent = self.span(), skip_all, fields(max_trades = query.max_trades))]
    pub async fn list_trades(&self, query: &TradeQuery) -> Result<Vec<Trade>> {
        let filters = query.filter_params()?;
        let total_pages = query.page_count();

        let mut all_trades: Vec<Trade> = Vec::new();
        for page in 1..=total_pages {
            let trades_left = (query.max_trades as usize).saturating_sub(all_trades.len());
            if trades_left == 0 {
                break;
            }
            let count = trades_left.min(PAGE_SIZE as usize);

            let mut params = filters.clone();
            params.push(("page".to_string(), page.to_string()));
            params.push(("count".to_string(), count.to_string()));

            let trades = self
                .fetch_trade_page(params)
                .await
                .inspect_err(|e| debug!(page, error = %e, "Error condition when querying trades"))?;

            if trades.is_empty() {
                debug!(page, "No trades were found on page");
                break;
            }
            debug!(page, found = trades.len(), "Trades found on page");
            all_trades.extend(trades);
        }

        if all_trades.is_empty() && query.has_lowercase_operator() {
            warn!(
                tag_expr = query.tag_expr.as_deref().unwrap_or(""),
                "No results found for dubious tag expression. Make sure AND and OR are uppercase"
            );
        }

        Ok(all_trades)
    }

    async fn fetch_trade_page(&self, params: Vec<(String, String)>) -> Result<Vec<Trade>> {
        let url = self.url(&["trades"]);
        let (resp, payload) = self
            .call(self.get(url).with_query(params), &[200], "Unable to query trades", true)
            .await?;
        debug!(url = %resp.url, "Successfully queried trades");
        extract_list::<Trade>(payload, "trades", &resp.url)
    }
}
