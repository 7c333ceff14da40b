//! `tradervue`: command-line front end for the Tradervue API.
//!
//! Loads `tradervue.toml` (optional) and `.env`, initialises structured
//! logging, runs one command and prints its result as JSON.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use tracing::{error, info};

use tradervue::config::AppConfig;
use tradervue::types::Execution;
use tradervue::{ImportBatch, ImportOutcome, ResourceId, TradeQuery, TradervueClient};

#[derive(Parser)]
#[command(name = "tradervue")]
#[command(about = "Import executions into and query trades from Tradervue")]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(long, short, default_value = "tradervue.toml")]
    config: String,

    /// Log full HTTP requests and responses
    #[arg(long)]
    verbose_http: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import executions from a JSON file holding an array of execution objects
    Import {
        file: String,
        #[arg(long)]
        account_tag: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        allow_duplicates: bool,
        #[arg(long)]
        overlay_commissions: bool,
        /// Poll until the importer reports success or failure
        #[arg(long)]
        wait: bool,
    },
    /// Show the importer's current status
    ImportStatus,
    /// List trades matching the given filters
    Trades {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        side: Option<String>,
        #[arg(long)]
        duration: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<NaiveDate>,
        /// YYYY-MM-DD
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "25")]
        max: u32,
    },
    /// Show a single trade
    Trade { id: String },
    /// Show the executions of a trade
    Executions { id: String },
    /// Show the comments on a trade
    Comments { id: String },
    /// Delete one or more trades
    DeleteTrades {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List users visible to this account
    Users,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args = Args::parse();
    let mut cfg = AppConfig::load_or_default(&args.config)?;
    if args.verbose_http {
        cfg.client.verbose_http = true;
    }

    init_logging(cfg.client.verbose_http);

    let credentials = cfg.credentials()?;
    info!(
        base_url = %cfg.client.base_url,
        user = %credentials.username,
        target_user = ?credentials.target_user,
        "Tradervue client starting"
    );
    let client = TradervueClient::from_config(&cfg.client, credentials)?;

    if let Err(e) = run(&client, &cfg, args.command).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }
    Ok(())
}

async fn run(client: &TradervueClient, cfg: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Import {
            file,
            account_tag,
            tags,
            allow_duplicates,
            overlay_commissions,
            wait,
        } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read executions file: {file}"))?;
            let executions: Vec<Execution> = serde_json::from_str(&contents)
                .with_context(|| format!("Executions file must hold a JSON array of objects: {file}"))?;

            let mut batch = ImportBatch::new(executions)
                .allow_duplicates(allow_duplicates)
                .overlay_commissions(overlay_commissions);
            if !tags.is_empty() {
                batch = batch.with_tags(tags);
            }
            if let Some(tag) = account_tag {
                batch = batch.with_account_tag(tag);
            }

            let outcome = client
                .import_executions(batch, &cfg.import.options(wait))
                .await?;
            match outcome {
                ImportOutcome::Submitted => info!("Import queued; not waiting for completion"),
                ImportOutcome::Succeeded(ref state) => print_json(state)?,
                ImportOutcome::Failed(ref state) => {
                    print_json(state)?;
                    anyhow::bail!("Import finished with failures");
                }
            }
        }
        Command::ImportStatus => print_json(&client.import_status().await?)?,
        Command::Trades {
            symbol,
            tag,
            side,
            duration,
            start,
            end,
            max,
        } => {
            let query = TradeQuery {
                symbol,
                tag_expr: tag,
                side,
                duration,
                start_date: start,
                end_date: end,
                max_trades: max,
            };
            print_json(&client.list_trades(&query).await?)?;
        }
        Command::Trade { id } => print_json(&client.get_trade(id).await?)?,
        Command::Executions { id } => print_json(&client.get_trade_executions(id).await?)?,
        Command::Comments { id } => print_json(&client.get_trade_comments(id).await?)?,
        Command::DeleteTrades { ids } => {
            let ids: Vec<ResourceId> = ids.into_iter().map(ResourceId::from).collect();
            let results = client.delete_trades(&ids).await;
            let failed = results.iter().filter(|r| r.is_err()).count();
            info!(deleted = results.len() - failed, failed, "Trade deletion finished");
            if failed > 0 {
                anyhow::bail!("{failed} of {} trade deletions failed", results.len());
            }
        }
        Command::Users => print_json(&client.list_users().await?)?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(verbose_http: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose_http { "tradervue=debug" } else { "tradervue=info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_logging = std::env::var("TRADERVUE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
