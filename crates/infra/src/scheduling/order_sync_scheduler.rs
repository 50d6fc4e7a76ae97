//! Cron scheduler for the order sync workflows.
//!
//! Registers one job per workflow (push, retry, cancel, update). Each job is
//! guarded by its own lock so a tick that fires while the previous run of the
//! same workflow is still going is skipped rather than stacked, and every run
//! is bounded by the configured job timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use returnsync_core::{OrderSyncService, SyncRunReport};
use returnsync_domain::{ReturnSyncError, ScheduleConfig, SyncWorkflow};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Timing and cron settings for [`OrderSyncScheduler`].
#[derive(Debug, Clone)]
pub struct OrderSyncSchedulerConfig {
    /// Cron expression (with seconds) per workflow. A blank expression
    /// leaves that workflow unscheduled.
    pub jobs: Vec<(SyncWorkflow, String)>,
    pub job_timeout: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    /// How often the monitor logs a heartbeat with tick counters.
    pub heartbeat_interval: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl OrderSyncSchedulerConfig {
    pub fn from_schedule(schedule: &ScheduleConfig) -> Self {
        Self {
            jobs: vec![
                (SyncWorkflow::Push, schedule.pending_cron.clone()),
                (SyncWorkflow::Retry, schedule.retry_cron.clone()),
                (SyncWorkflow::Cancel, schedule.cancel_cron.clone()),
                (SyncWorkflow::Update, schedule.update_cron.clone()),
            ],
            job_timeout: Duration::from_secs(schedule.job_timeout_secs.max(1)),
            start_timeout: Duration::from_secs(schedule.start_timeout_secs.max(1)),
            stop_timeout: Duration::from_secs(schedule.stop_timeout_secs.max(1)),
            heartbeat_interval: Duration::from_secs(300),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for OrderSyncSchedulerConfig {
    fn default() -> Self {
        Self::from_schedule(&ScheduleConfig::default())
    }
}

#[derive(Debug, Error)]
#[error("{workflow} sync run failed")]
struct SyncJobError {
    workflow: SyncWorkflow,
    #[source]
    source: ReturnSyncError,
}

impl SyncJobError {
    fn kind(&self) -> &'static str {
        match &self.source {
            ReturnSyncError::Database(_) | ReturnSyncError::Conflict(_) => "queue_store_failed",
            ReturnSyncError::Authorization(_)
            | ReturnSyncError::RemoteServiceUnavailable { .. } => "remote_failed",
            _ => "run_failed",
        }
    }
}

/// Result of one scheduled tick.
#[derive(Debug)]
pub(crate) enum JobOutcome {
    Finished(SyncRunReport),
    /// The previous run of the same workflow still held the lock.
    Busy,
    Failed(&'static str),
    TimedOut,
}

/// Tick outcomes across all workflow jobs of one scheduler run.
#[derive(Debug, Default)]
pub(crate) struct TickCounters {
    finished: AtomicU64,
    missed: AtomicU64,
    failed: AtomicU64,
}

impl TickCounters {
    /// Busy and timed-out ticks count as missed.
    pub(crate) fn record(&self, outcome: &JobOutcome) {
        let counter = match outcome {
            JobOutcome::Finished(_) => &self.finished,
            JobOutcome::Busy | JobOutcome::TimedOut => &self.missed,
            JobOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// `(finished, missed, failed)`
    pub(crate) fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.finished.load(Ordering::Relaxed),
            self.missed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// Runs the order sync workflows on their cron schedules.
pub struct OrderSyncScheduler {
    scheduler: Option<JobScheduler>,
    config: OrderSyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    counters: Arc<TickCounters>,
    service: Arc<OrderSyncService>,
}

impl OrderSyncScheduler {
    pub fn new(config: OrderSyncSchedulerConfig, service: Arc<OrderSyncService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            counters: Arc::new(TickCounters::default()),
            service,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();
        self.counters = Arc::new(TickCounters::default());

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|err| SchedulerError::StartFailed(err.to_string()))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let counters = Arc::clone(&self.counters);
        let interval = self.config.heartbeat_interval;
        self.monitor_handle = Some(tokio::spawn(Self::monitor_task(cancel, counters, interval)));

        info!(scheduler = "order_sync", event = "start", "order sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, scheduler.shutdown())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|err| SchedulerError::StopFailed(err.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!(scheduler = "order_sync", event = "stop", "order sync scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler =
            JobScheduler::new().await.map_err(|err| SchedulerError::CreationFailed(err.to_string()))?;

        for (workflow, cron) in &self.config.jobs {
            let cron = cron.trim();
            if cron.is_empty() {
                debug!(workflow = %workflow, "no cron configured, workflow not scheduled");
                continue;
            }

            let job = self.job_for(*workflow, cron)?;
            let job_id = job.guid();
            scheduler.add(job).await.map_err(|err| {
                SchedulerError::JobRegistrationFailed(format!("{workflow}: {err}"))
            })?;
            debug!(workflow = %workflow, cron, job_id = %job_id, "registered order sync job");
        }

        Ok(scheduler)
    }

    fn job_for(&self, workflow: SyncWorkflow, cron: &str) -> SchedulerResult<Job> {
        let service = Arc::clone(&self.service);
        let guard = Arc::new(Mutex::new(()));
        let counters = Arc::clone(&self.counters);
        let job_timeout = self.config.job_timeout;

        Job::new_async(cron, move |_id, _lock| {
            let service = Arc::clone(&service);
            let guard = Arc::clone(&guard);
            let counters = Arc::clone(&counters);
            Box::pin(async move {
                let outcome = Self::run_job(service, workflow, guard, job_timeout).await;
                counters.record(&outcome);
            })
        })
        .map_err(|err| SchedulerError::JobRegistrationFailed(format!("{workflow} ({cron}): {err}")))
    }

    /// Run one workflow pass unless the previous one is still in flight.
    pub(crate) async fn run_job(
        service: Arc<OrderSyncService>,
        workflow: SyncWorkflow,
        guard: Arc<Mutex<()>>,
        job_timeout: Duration,
    ) -> JobOutcome {
        let Ok(_held) = guard.try_lock() else {
            warn!(
                scheduler = "order_sync",
                event = "job_busy",
                workflow = %workflow,
                "previous run still in progress, skipping tick"
            );
            return JobOutcome::Busy;
        };

        let started = Instant::now();
        match tokio::time::timeout(job_timeout, service.run(workflow)).await {
            Ok(Ok(report)) => {
                if report.selected > 0 {
                    info!(
                        scheduler = "order_sync",
                        event = "job_complete",
                        workflow = %workflow,
                        selected = report.selected,
                        synced = report.synced,
                        failed = report.failed,
                        skipped = report.skipped,
                        conflicts = report.conflicts,
                        elapsed_ms = started.elapsed().as_millis(),
                        "order sync run finished"
                    );
                }
                JobOutcome::Finished(report)
            }
            Ok(Err(source)) => {
                let err = SyncJobError { workflow, source };
                error!(
                    scheduler = "order_sync",
                    workflow = %workflow,
                    error = ?err,
                    error_kind = err.kind(),
                    "order sync run failed"
                );
                JobOutcome::Failed(err.kind())
            }
            Err(_) => {
                warn!(
                    scheduler = "order_sync",
                    event = "job_timeout",
                    workflow = %workflow,
                    timeout_secs = job_timeout.as_secs(),
                    "order sync run timed out"
                );
                JobOutcome::TimedOut
            }
        }
    }

    /// Log a heartbeat every `interval` until cancelled, warning when ticks
    /// were missed since the previous one.
    pub(crate) async fn monitor_task(
        cancel: CancellationToken,
        counters: Arc<TickCounters>,
        interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.tick().await;
        let mut last_missed = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(
                        scheduler = "order_sync",
                        event = "monitor_cancelled",
                        "order sync scheduler monitor cancelled"
                    );
                    break;
                }
                _ = ticker.tick() => {
                    let (finished, missed, failed) = counters.snapshot();
                    if missed > last_missed {
                        warn!(
                            scheduler = "order_sync",
                            event = "ticks_missed",
                            missed = missed - last_missed,
                            "order sync ticks skipped or timed out since last heartbeat"
                        );
                    }
                    last_missed = missed;
                    debug!(
                        scheduler = "order_sync",
                        event = "heartbeat",
                        finished,
                        missed,
                        failed,
                        "order sync scheduler heartbeat"
                    );
                }
            }
        }
    }
}

impl Drop for OrderSyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(
                scheduler = "order_sync",
                event = "drop_cancel",
                "OrderSyncScheduler dropped while running; cancelling tasks"
            );
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use returnsync_core::{CatalogRepository, OrderQueueRepository, OrderRepository, ReturnsApi};
    use returnsync_domain::{
        AttributeDefinition, BatchQuery, Category, CategoryId, HostOrder, OrderId,
        OrderSyncSettings, Product, ProductId, QueueEntry, QueueInsert, QueueStatus,
        Result as DomainResult, StoreId, StoreInfo,
    };
    use serde_json::Value;

    use super::*;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Empty,
        Fail,
        Stall(Duration),
    }

    struct StubQueue {
        behaviour: Behaviour,
        batches: AtomicUsize,
    }

    impl StubQueue {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self { behaviour, batches: AtomicUsize::new(0) })
        }

        fn batches(&self) -> usize {
            self.batches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OrderQueueRepository for StubQueue {
        async fn insert_if_absent(
            &self,
            _order_id: OrderId,
            _initial_status: QueueStatus,
        ) -> DomainResult<QueueInsert> {
            Err(ReturnSyncError::Internal("not used".into()))
        }

        async fn find_batch(&self, _query: BatchQuery) -> DomainResult<Vec<QueueEntry>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Empty => Ok(Vec::new()),
                Behaviour::Fail => Err(ReturnSyncError::Database("database is locked".into())),
                Behaviour::Stall(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn find_by_order_id(&self, _order_id: OrderId) -> DomainResult<Option<QueueEntry>> {
            Ok(None)
        }

        async fn try_claim(&self, _entry: &QueueEntry) -> DomainResult<Option<QueueEntry>> {
            Ok(None)
        }

        async fn update(&self, entry: &QueueEntry) -> DomainResult<QueueEntry> {
            Ok(entry.clone())
        }

        async fn requeue(
            &self,
            _order_id: OrderId,
            _status: QueueStatus,
        ) -> DomainResult<QueueEntry> {
            Err(ReturnSyncError::Internal("not used".into()))
        }

        async fn count_by_status(&self) -> DomainResult<BTreeMap<QueueStatus, u64>> {
            Ok(BTreeMap::new())
        }
    }

    struct NoHostData;

    #[async_trait]
    impl OrderRepository for NoHostData {
        async fn get_by_ids(&self, _ids: &[OrderId]) -> DomainResult<Vec<HostOrder>> {
            Ok(Vec::new())
        }

        async fn list_backfill_candidates(
            &self,
            _created_after: Option<DateTime<Utc>>,
        ) -> DomainResult<Vec<HostOrder>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl CatalogRepository for NoHostData {
        async fn product(
            &self,
            _store_id: StoreId,
            _product_id: ProductId,
        ) -> DomainResult<Option<Product>> {
            Ok(None)
        }

        async fn categories(&self, _ids: &[CategoryId]) -> DomainResult<Vec<Category>> {
            Ok(Vec::new())
        }

        async fn attribute(&self, _code: &str) -> DomainResult<Option<AttributeDefinition>> {
            Ok(None)
        }

        async fn store(&self, _store_id: StoreId) -> DomainResult<Option<StoreInfo>> {
            Ok(None)
        }
    }

    struct OfflineApi;

    #[async_trait]
    impl ReturnsApi for OfflineApi {
        async fn access_token(&self, _scope: &str) -> DomainResult<String> {
            Err(ReturnSyncError::Authorization("offline".into()))
        }

        async fn post(
            &self,
            _path: &str,
            _scope: &str,
            _body: Option<&Value>,
        ) -> DomainResult<Value> {
            Err(ReturnSyncError::Authorization("offline".into()))
        }

        async fn patch(&self, _path: &str, _scope: &str, _body: &Value) -> DomainResult<Value> {
            Err(ReturnSyncError::Authorization("offline".into()))
        }
    }

    fn service(queue: Arc<StubQueue>) -> Arc<OrderSyncService> {
        let settings =
            OrderSyncSettings { enabled: true, company_id: "42".into(), ..Default::default() };
        Arc::new(OrderSyncService::new(
            queue,
            Arc::new(NoHostData),
            Arc::new(NoHostData),
            Arc::new(OfflineApi),
            settings,
        ))
    }

    fn fast_config() -> OrderSyncSchedulerConfig {
        OrderSyncSchedulerConfig {
            jobs: SyncWorkflow::ALL.iter().map(|w| (*w, "*/1 * * * * *".to_string())).collect(),
            job_timeout: Duration::from_secs(2),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            heartbeat_interval: Duration::from_millis(200),
            join_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_successfully() {
        let queue = StubQueue::new(Behaviour::Empty);
        let mut scheduler = OrderSyncScheduler::new(fast_config(), service(queue.clone()));

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert!(!scheduler.is_running());
        assert!(queue.batches() >= 1, "at least one workflow tick ran");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let mut scheduler =
            OrderSyncScheduler::new(fast_config(), service(StubQueue::new(Behaviour::Empty)));

        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_start_is_rejected() {
        let mut scheduler =
            OrderSyncScheduler::new(fast_config(), service(StubQueue::new(Behaviour::Empty)));
        let err = scheduler.stop().await.expect_err("stop fails");
        assert!(matches!(err, SchedulerError::NotRunning));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_after_stop_succeeds() {
        let mut scheduler =
            OrderSyncScheduler::new(fast_config(), service(StubQueue::new(Behaviour::Empty)));

        scheduler.start().await.expect("start succeeds");
        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());

        scheduler.start().await.expect("start again");
        scheduler.stop().await.expect("stop again");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_cron_fails_registration() {
        let mut config = fast_config();
        config.jobs = vec![(SyncWorkflow::Cancel, "every five minutes".into())];
        let mut scheduler =
            OrderSyncScheduler::new(config, service(StubQueue::new(Behaviour::Empty)));

        let err = scheduler.start().await.expect_err("bad cron is rejected");
        assert!(matches!(err, SchedulerError::JobRegistrationFailed(msg) if msg.contains("cancel")));
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_cron_leaves_workflow_unscheduled() {
        let mut config = fast_config();
        config.jobs = vec![(SyncWorkflow::Update, "  ".into())];
        let queue = StubQueue::new(Behaviour::Empty);
        let mut scheduler = OrderSyncScheduler::new(config, service(queue.clone()));

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert_eq!(queue.batches(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_job_reports_finished_run() {
        let queue = StubQueue::new(Behaviour::Empty);
        let outcome = OrderSyncScheduler::run_job(
            service(queue.clone()),
            SyncWorkflow::Push,
            Arc::new(Mutex::new(())),
            Duration::from_secs(1),
        )
        .await;

        match outcome {
            JobOutcome::Finished(report) => {
                assert_eq!(report.workflow, SyncWorkflow::Push);
                assert_eq!(report.selected, 0);
            }
            other => panic!("expected finished run, got {other:?}"),
        }
        assert_eq!(queue.batches(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_job_skips_tick_while_previous_run_holds_lock() {
        let queue = StubQueue::new(Behaviour::Empty);
        let guard = Arc::new(Mutex::new(()));
        let _held = guard.lock().await;

        let outcome = OrderSyncScheduler::run_job(
            service(queue.clone()),
            SyncWorkflow::Retry,
            Arc::clone(&guard),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(outcome, JobOutcome::Busy));
        assert_eq!(queue.batches(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_job_times_out_slow_runs() {
        let queue = StubQueue::new(Behaviour::Stall(Duration::from_millis(500)));
        let outcome = OrderSyncScheduler::run_job(
            service(queue),
            SyncWorkflow::Push,
            Arc::new(Mutex::new(())),
            Duration::from_millis(20),
        )
        .await;

        assert!(matches!(outcome, JobOutcome::TimedOut));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_job_classifies_store_failures() {
        let outcome = OrderSyncScheduler::run_job(
            service(StubQueue::new(Behaviour::Fail)),
            SyncWorkflow::Cancel,
            Arc::new(Mutex::new(())),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(outcome, JobOutcome::Failed("queue_store_failed")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn counters_track_missed_and_failed_ticks() {
        let counters = TickCounters::default();
        let guard = Arc::new(Mutex::new(()));

        let finished = OrderSyncScheduler::run_job(
            service(StubQueue::new(Behaviour::Empty)),
            SyncWorkflow::Push,
            Arc::clone(&guard),
            Duration::from_secs(1),
        )
        .await;
        counters.record(&finished);

        let held = guard.lock().await;
        let busy = OrderSyncScheduler::run_job(
            service(StubQueue::new(Behaviour::Empty)),
            SyncWorkflow::Push,
            Arc::clone(&guard),
            Duration::from_secs(1),
        )
        .await;
        drop(held);
        counters.record(&busy);
        counters.record(&JobOutcome::TimedOut);
        counters.record(&JobOutcome::Failed("run_failed"));

        assert_eq!(counters.snapshot(), (1, 2, 1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn monitor_keeps_beating_until_cancelled() {
        let cancel = CancellationToken::new();
        let counters = Arc::new(TickCounters::default());
        let handle = tokio::spawn(OrderSyncScheduler::monitor_task(
            cancel.clone(),
            Arc::clone(&counters),
            Duration::from_millis(10),
        ));

        counters.record(&JobOutcome::Busy);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "monitor runs until cancelled");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor exits after cancel")
            .expect("monitor task joins");
    }

    #[test]
    fn job_error_kind_reports_source_class() {
        let remote = SyncJobError {
            workflow: SyncWorkflow::Push,
            source: ReturnSyncError::Authorization("token".into()),
        };
        let other = SyncJobError {
            workflow: SyncWorkflow::Update,
            source: ReturnSyncError::Internal("boom".into()),
        };

        assert_eq!(remote.kind(), "remote_failed");
        assert_eq!(other.kind(), "run_failed");
        assert_eq!(other.to_string(), "update sync run failed");
    }
}
