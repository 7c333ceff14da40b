//! Tradervue: async client for the Tradervue trade-journal REST API.
//!
//! Library crate exposing all modules for use by integration tests
//! and the `tradervue` binary.

pub mod client;
pub mod config;
pub mod error;
pub mod imports;
pub mod resources;
pub mod response;
pub mod transport;
pub mod types;

pub use client::TradervueClient;
pub use error::{Result, TradervueError};
pub use imports::{ImportOptions, ImportOutcome};
pub use resources::{TradeDuration, TradeQuery, TradeSide};
pub use types::{Credentials, Execution, ImportBatch, ImportState, ImportStatus, ResourceId};
