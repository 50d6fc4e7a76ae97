//! ReturnSync - order sync queue for an external returns API.
//!
//! Hosts the scheduled sync jobs (`run`) and the operator actions: one-shot
//! runs, backfill, credential check, host snapshot import and manual
//! cancellation.

mod commands;
mod context;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use returnsync_domain::OrderId;
use returnsync_infra::config::{load, load_from_file};
use returnsync_infra::init_tracing;
use tracing::debug;

use crate::commands::WorkflowArg;
use crate::context::AppContext;

#[derive(Parser)]
#[command(name = "returnsync", version, about = "Order sync queue for a returns API")]
struct Cli {
    /// Config file (TOML or JSON). Defaults to env vars, then the standard
    /// file locations.
    #[arg(long, global = true, env = "RETURNSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sync jobs on their cron schedules until interrupted
    Run,
    /// Run one pass of a workflow now
    Sync {
        #[arg(value_enum, default_value = "all")]
        workflow: WorkflowArg,
    },
    /// Queue historical orders that were never queued
    Backfill {
        /// Only orders created in the last N days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Check the configured API credentials
    TestCredentials,
    /// Import a host snapshot (orders and catalog) from a JSON file
    Import { file: PathBuf },
    /// Mark an order canceled and queue the remote cancellation
    CancelOrder { order_id: OrderId },
    /// Create or upgrade the database schema
    Migrate,
    /// Print queue entry counts by status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => load_from_file(Some(path))?,
        None => load()?,
    };
    let _log_guard = init_tracing(&config.logging)?;
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded .env");
    }

    if let Command::Migrate = cli.command {
        return commands::migrate(&config);
    }

    let ctx = AppContext::new(config)?;
    match cli.command {
        Command::Run => commands::run(ctx).await,
        Command::Sync { workflow } => commands::sync(&ctx, workflow).await,
        Command::Backfill { days } => commands::backfill(&ctx, days).await,
        Command::TestCredentials => commands::test_credentials(&ctx).await,
        Command::Import { file } => commands::import(&ctx, &file).await,
        Command::CancelOrder { order_id } => commands::cancel_order(&ctx, order_id).await,
        Command::Status => commands::status(&ctx).await,
        Command::Migrate => Ok(()),
    }
}
