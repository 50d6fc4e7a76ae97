//! Order sync service
//!
//! One call to [`OrderSyncService::run`] is one scheduled pass for one
//! workflow: select a bounded batch, reload the host orders, and dispatch
//! each entry sequentially. API failures are recorded on the entry and never
//! abort the batch. Queue write failures are collected and reported once the
//! batch has been walked.

use std::collections::HashMap;
use std::sync::Arc;

use returnsync_domain::{
    BatchQuery, HostOrder, OrderId, OrderSyncSettings, QueueEntry, Result, ReturnSyncError,
    SyncWorkflow,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::eligibility::{self, SkipReason};
use super::report::SyncRunReport;
use crate::api::ports::ReturnsApi;
use crate::api::purchases::{self, PurchasesClient};
use crate::host::ports::{CatalogRepository, OrderRepository};
use crate::payload::{BatchContext, PurchasePayloadBuilder};
use crate::queue::ports::OrderQueueRepository;

/// What the API said about one dispatch.
struct Dispatch {
    accepted: bool,
    external_order_id: Option<String>,
}

/// Runs the push, retry, cancel and update workflows.
pub struct OrderSyncService {
    queue: Arc<dyn OrderQueueRepository>,
    orders: Arc<dyn OrderRepository>,
    payloads: PurchasePayloadBuilder,
    purchases: PurchasesClient,
    settings: OrderSyncSettings,
}

impl OrderSyncService {
    pub fn new(
        queue: Arc<dyn OrderQueueRepository>,
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        api: Arc<dyn ReturnsApi>,
        settings: OrderSyncSettings,
    ) -> Self {
        let payloads = PurchasePayloadBuilder::new(catalog, settings.company_id.clone());
        let purchases = PurchasesClient::new(api, settings.company_id.clone());
        Self { queue, orders, payloads, purchases, settings }
    }

    /// Deliver orders queued as pending.
    pub async fn process_pending_orders(&self) -> Result<SyncRunReport> {
        self.run(SyncWorkflow::Push).await
    }

    /// Redeliver failed orders within the fail budget.
    pub async fn retry_failed_orders(&self) -> Result<SyncRunReport> {
        self.run(SyncWorkflow::Retry).await
    }

    pub async fn process_cancel_orders(&self) -> Result<SyncRunReport> {
        self.run(SyncWorkflow::Cancel).await
    }

    pub async fn process_update_orders(&self) -> Result<SyncRunReport> {
        self.run(SyncWorkflow::Update).await
    }

    /// Run one pass of `workflow`.
    ///
    /// # Errors
    /// Fails if the batch or its orders cannot be loaded, or if any queue
    /// write other than a version conflict failed during the pass.
    #[instrument(skip(self), fields(workflow = %workflow))]
    pub async fn run(&self, workflow: SyncWorkflow) -> Result<SyncRunReport> {
        let query = BatchQuery::for_workflow(
            workflow,
            self.settings.batch_size,
            self.settings.max_fails,
        );
        let entries = self.queue.find_batch(query).await?;
        let mut report = SyncRunReport::new(workflow);
        report.selected = entries.len();

        if entries.is_empty() {
            debug!(workflow = %workflow, "no queue entries to process");
            return Ok(report);
        }

        let ids: Vec<OrderId> = entries.iter().map(|entry| entry.order_id).collect();
        let orders: HashMap<OrderId, HostOrder> = self
            .orders
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .filter_map(|order| order.id.map(|id| (id, order)))
            .collect();

        let mut context = BatchContext::new();
        let mut store_errors: Vec<String> = Vec::new();

        for entry in entries {
            let Some(order) = orders.get(&entry.order_id) else {
                warn!(
                    order_id = entry.order_id,
                    sync_id = entry.id,
                    reason = %SkipReason::OrderNotFound,
                    "queued order not found"
                );
                report.skipped = report.skipped.saturating_add(1);
                continue;
            };

            if let Err(reason) = eligibility::check_dispatch(workflow, order, &self.settings) {
                debug!(order_id = entry.order_id, reason = %reason, "entry not eligible");
                report.skipped = report.skipped.saturating_add(1);
                continue;
            }

            let mut claimed = match self.queue.try_claim(&entry).await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => {
                    debug!(order_id = entry.order_id, "entry changed since selection, skipping");
                    report.conflicts = report.conflicts.saturating_add(1);
                    continue;
                }
                Err(err) => {
                    warn!(order_id = entry.order_id, error = %err, "failed to claim queue entry");
                    store_errors.push(format!("claim {}: {err}", entry.order_id));
                    continue;
                }
            };

            self.dispatch_and_record(workflow, order, &mut claimed, &mut context).await;

            match self.queue.update(&claimed).await {
                Ok(saved) if saved.status == workflow.success_status() => {
                    report.synced = report.synced.saturating_add(1);
                }
                Ok(_) => report.failed = report.failed.saturating_add(1),
                Err(ReturnSyncError::Conflict(message)) => {
                    warn!(
                        order_id = entry.order_id,
                        detail = %message,
                        "queue entry changed during dispatch; keeping the newer state"
                    );
                    report.conflicts = report.conflicts.saturating_add(1);
                }
                Err(err) => {
                    warn!(order_id = entry.order_id, error = %err, "failed to save queue entry");
                    store_errors.push(format!("update {}: {err}", entry.order_id));
                }
            }
        }

        info!(
            workflow = %workflow,
            selected = report.selected,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            conflicts = report.conflicts,
            "order sync run finished"
        );

        if store_errors.is_empty() {
            Ok(report)
        } else {
            Err(ReturnSyncError::Database(format!(
                "{} queue write(s) failed during {workflow} run: {}",
                store_errors.len(),
                store_errors.join("; ")
            )))
        }
    }

    /// Call the API for one entry and apply the outcome to it.
    async fn dispatch_and_record(
        &self,
        workflow: SyncWorkflow,
        order: &HostOrder,
        entry: &mut QueueEntry,
        context: &mut BatchContext,
    ) {
        match self.dispatch(workflow, order, context).await {
            Ok(Dispatch { accepted: true, external_order_id }) => {
                entry.record_success(workflow);
                if external_order_id.is_some() {
                    entry.external_order_id = external_order_id;
                }
            }
            Ok(Dispatch { accepted: false, .. }) => {
                warn!(
                    order_id = entry.order_id,
                    increment_id = %order.increment_id,
                    workflow = %workflow,
                    "returns API did not confirm the request"
                );
                entry.record_failure(workflow);
            }
            Err(err) => {
                warn!(
                    order_id = entry.order_id,
                    error_kind = err.kind(),
                    "(Order ID: {}) {}",
                    entry.order_id,
                    err
                );
                entry.record_failure(workflow);
            }
        }
    }

    async fn dispatch(
        &self,
        workflow: SyncWorkflow,
        order: &HostOrder,
        context: &mut BatchContext,
    ) -> Result<Dispatch> {
        let email = order.customer_email.as_deref().unwrap_or_default();
        let response: Value = match workflow {
            SyncWorkflow::Push | SyncWorkflow::Retry => {
                let payload = self.payloads.build_create_payload(order, context).await?;
                self.purchases.create(&payload).await?
            }
            SyncWorkflow::Update => {
                let payload = self.payloads.build_update_payload(order);
                self.purchases.update(&order.increment_id, email, &payload).await?
            }
            SyncWorkflow::Cancel => self.purchases.cancel(&order.increment_id, email).await?,
        };

        let accepted = match workflow {
            SyncWorkflow::Cancel => purchases::is_cancel_confirmed(&response),
            _ => purchases::has_resource(&response),
        };
        let external_order_id = match workflow {
            SyncWorkflow::Push | SyncWorkflow::Retry if accepted => {
                purchases::resource_id(&response)
            }
            _ => None,
        };

        Ok(Dispatch { accepted, external_order_id })
    }
}

impl std::fmt::Debug for OrderSyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSyncService").field("settings", &self.settings).finish_non_exhaustive()
    }
}

