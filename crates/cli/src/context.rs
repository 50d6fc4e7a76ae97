//! Application context - wires the adapters behind the core services.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use returnsync_core::{
    BackfillService, CredentialCheck, EnqueueOutcome, OrderQueueRepository, OrderSyncService,
    QueueEnqueuer,
};
use returnsync_domain::{Config, OrderId, QueueStatus, Result, ReturnSyncError};
use returnsync_infra::{
    DbManager, HostSnapshot, ImportSummary, OrderSyncScheduler, OrderSyncSchedulerConfig,
    ReturnsApiClient, SqliteHostStore, SqliteOrderQueueRepository,
};
use serde::Serialize;
use tracing::{debug, info};

/// Everything a command needs, built once from the loaded [`Config`].
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub queue: Arc<SqliteOrderQueueRepository>,
    pub host: Arc<SqliteHostStore>,
    pub sync: Arc<OrderSyncService>,
    pub enqueuer: QueueEnqueuer,
    pub backfill: BackfillService,
    pub credentials: CredentialCheck,
}

/// Queue writes caused by one host snapshot import.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub orders: usize,
    pub products: usize,
    pub queued: u32,
    pub requeued: u32,
    pub unchanged: u32,
    pub skipped: u32,
}

impl AppContext {
    /// Open the database, apply migrations and build the services.
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(open_database(&config)?);
        let queue = Arc::new(SqliteOrderQueueRepository::new(Arc::clone(&db)));
        let host = Arc::new(SqliteHostStore::new(Arc::clone(&db)));
        let api = Arc::new(ReturnsApiClient::from_config(&config.api)?);
        let settings = config.order_sync.clone();

        let sync = Arc::new(OrderSyncService::new(
            queue.clone(),
            host.clone(),
            host.clone(),
            api.clone(),
            settings.clone(),
        ));
        let enqueuer = QueueEnqueuer::new(queue.clone(), settings.clone());
        let backfill = BackfillService::new(host.clone(), queue.clone(), settings.clone());
        let credentials = CredentialCheck::new(api, settings.company_id);

        debug!(db = %db.path().display(), mode = %config.api.mode, "application context ready");
        Ok(Self { config, db, queue, host, sync, enqueuer, backfill, credentials })
    }

    pub fn scheduler(&self) -> OrderSyncScheduler {
        OrderSyncScheduler::new(
            OrderSyncSchedulerConfig::from_schedule(&self.config.schedule),
            Arc::clone(&self.sync),
        )
    }

    /// Store a host snapshot and replay the order events it implies.
    ///
    /// Events come from the difference against the stored orders, so an
    /// identical re-import leaves the queue untouched. A cancellation is
    /// queued only for tracked orders that just became canceled. An address
    /// change goes through the update path. Anything else is offered to the
    /// create path, which never touches an existing entry.
    pub async fn import_snapshot(&self, snapshot: HostSnapshot) -> Result<ImportReport> {
        let summary: ImportSummary = self.host.import(snapshot).await?;
        let mut report =
            ImportReport { orders: summary.orders, products: summary.products, ..Default::default() };

        for change in &summary.changes {
            let order = &change.order;
            let outcome = match order.id {
                Some(order_id) if order.is_canceled() => {
                    let tracked = self.queue.find_by_order_id(order_id).await?.is_some();
                    if !(tracked && (change.became_canceled() || change.previous.is_none())) {
                        report.unchanged += 1;
                        continue;
                    }
                    self.enqueuer.on_order_canceled(order_id).await?
                }
                _ if change.shipping_changed() => self.enqueuer.on_order_updated(order).await?,
                _ => self.enqueuer.on_order_created(order).await?,
            };
            match outcome {
                EnqueueOutcome::Queued(_) => report.queued += 1,
                EnqueueOutcome::Requeued(_) => report.requeued += 1,
                EnqueueOutcome::AlreadyQueued(_) => report.unchanged += 1,
                EnqueueOutcome::Skipped(_) => report.skipped += 1,
            }
        }

        info!(
            orders = report.orders,
            queued = report.queued,
            requeued = report.requeued,
            skipped = report.skipped,
            "snapshot import applied to queue"
        );
        Ok(report)
    }

    /// Cancel an order on the host side and queue the remote cancellation.
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<EnqueueOutcome> {
        self.host.mark_canceled(order_id).await?;
        self.enqueuer.on_order_canceled(order_id).await
    }

    pub async fn queue_status(&self) -> Result<BTreeMap<QueueStatus, u64>> {
        self.queue.count_by_status().await
    }
}

/// Open the configured database and bring its schema up to date.
pub fn open_database(config: &Config) -> Result<DbManager> {
    let path = Path::new(&config.database.path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| {
            ReturnSyncError::Config(format!(
                "cannot create database directory {}: {err}",
                parent.display()
            ))
        })?;
    }

    let db = DbManager::new(path, config.database.pool_size)?;
    db.run_migrations()?;
    Ok(db)
}
