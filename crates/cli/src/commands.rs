//! Command handlers. Each prints a JSON document on success.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use returnsync_domain::{Config, OrderId, SyncWorkflow};
use returnsync_infra::HostSnapshot;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::context::{open_database, AppContext};

/// Which workflow(s) a one-shot `sync` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WorkflowArg {
    Push,
    Retry,
    Cancel,
    Update,
    All,
}

impl WorkflowArg {
    fn workflows(self) -> Vec<SyncWorkflow> {
        match self {
            Self::Push => vec![SyncWorkflow::Push],
            Self::Retry => vec![SyncWorkflow::Retry],
            Self::Cancel => vec![SyncWorkflow::Cancel],
            Self::Update => vec![SyncWorkflow::Update],
            Self::All => SyncWorkflow::ALL.to_vec(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the cron scheduler until Ctrl-C.
pub async fn run(ctx: AppContext) -> Result<()> {
    if !ctx.config.order_sync.enabled && ctx.config.order_sync.store_overrides.is_empty() {
        warn!("order sync is disabled for every store; jobs will skip all orders");
    }

    let mut scheduler = ctx.scheduler();
    scheduler.start().await.context("failed to start scheduler")?;
    info!("scheduler running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown requested");

    scheduler.stop().await.context("failed to stop scheduler")?;
    Ok(())
}

pub async fn sync(ctx: &AppContext, workflow: WorkflowArg) -> Result<()> {
    let mut reports = Vec::new();
    for workflow in workflow.workflows() {
        let report = ctx
            .sync
            .run(workflow)
            .await
            .with_context(|| format!("{workflow} run failed"))?;
        reports.push(report);
    }
    print_json(&reports)
}

pub async fn backfill(ctx: &AppContext, days: Option<u32>) -> Result<()> {
    let report = ctx.backfill.backfill(days, Utc::now().date_naive()).await?;
    print_json(&json!({
        "queued": report.queued,
        "already_queued": report.already_queued,
        "skipped": report.skipped,
        "created_after": report.created_after.map(|date| date.to_string()),
        "message": report.message(),
    }))
}

pub async fn test_credentials(ctx: &AppContext) -> Result<()> {
    let result = ctx.credentials.test_credentials().await;
    print_json(&json!({ "success": result.success, "message": result.message }))?;
    if !result.success {
        bail!("{}", result.message);
    }
    Ok(())
}

pub async fn import(ctx: &AppContext, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read snapshot {}", file.display()))?;
    let snapshot: HostSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("invalid snapshot JSON in {}", file.display()))?;

    let report = ctx.import_snapshot(snapshot).await?;
    print_json(&report)
}

pub async fn cancel_order(ctx: &AppContext, order_id: OrderId) -> Result<()> {
    let outcome = ctx.cancel_order(order_id).await?;
    let entry = outcome.entry().context("cancellation was not queued")?;
    print_json(entry)
}

pub async fn status(ctx: &AppContext) -> Result<()> {
    let counts = ctx.queue_status().await?;
    let counts: serde_json::Map<String, serde_json::Value> =
        counts.into_iter().map(|(status, count)| (status.to_string(), json!(count))).collect();
    print_json(&counts)
}

/// Apply migrations without building the API client.
pub fn migrate(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    db.health_check()?;
    print_json(&json!({ "database": db.path().display().to_string(), "migrated": true }))
}
