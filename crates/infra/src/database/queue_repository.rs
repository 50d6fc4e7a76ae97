//! SQLite-backed implementation of the order queue port.
//!
//! Every write bumps `version`. Claims and updates are conditional on the
//! version the caller read, so a cancel or update event that lands while a
//! scheduled run is in flight is never overwritten by that run.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use returnsync_core::OrderQueueRepository;
use returnsync_domain::{
    BatchQuery, OrderId, QueueEntry, QueueInsert, QueueStatus, Result as DomainResult,
    ReturnSyncError,
};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::warn;

use super::manager::{map_sql_error, DbManager, SqliteConnection};

/// Queue store over the `order_sync_queue` table.
pub struct SqliteOrderQueueRepository {
    db: Arc<DbManager>,
}

impl SqliteOrderQueueRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn with_connection<T, F>(&self, op: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = db.get_connection()?;
            op(&mut conn)
        })
        .await
        .map_err(map_join_error)?
    }

    fn select_by_order_id(
        conn: &rusqlite::Connection,
        order_id: OrderId,
    ) -> DomainResult<Option<QueueEntry>> {
        conn.query_row(QUEUE_SELECT_BY_ORDER_SQL, params![order_id], map_queue_row)
            .optional()
            .map_err(map_sql_error)
    }

    fn select_by_sync_id(conn: &rusqlite::Connection, sync_id: i64) -> DomainResult<QueueEntry> {
        conn.query_row(QUEUE_SELECT_BY_ID_SQL, params![sync_id], map_queue_row)
            .optional()
            .map_err(map_sql_error)?
            .ok_or_else(|| ReturnSyncError::NotFound(format!("queue entry {sync_id}")))
    }
}

#[async_trait]
impl OrderQueueRepository for SqliteOrderQueueRepository {
    async fn insert_if_absent(
        &self,
        order_id: OrderId,
        initial_status: QueueStatus,
    ) -> DomainResult<QueueInsert> {
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let now = now_millis();
            let inserted = tx
                .execute(QUEUE_INSERT_IF_ABSENT_SQL, params![order_id, initial_status.as_str(), now])
                .map_err(map_sql_error)?;
            let entry = Self::select_by_order_id(&tx, order_id)?.ok_or_else(|| {
                ReturnSyncError::Internal(format!("queue entry for order {order_id} vanished"))
            })?;
            tx.commit().map_err(map_sql_error)?;
            Ok(QueueInsert { entry, created: inserted > 0 })
        })
        .await
    }

    async fn find_batch(&self, query: BatchQuery) -> DomainResult<Vec<QueueEntry>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(QUEUE_BATCH_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params![
                        query.status.as_str(),
                        query.max_fail_count,
                        usize_to_i64(query.limit)
                    ],
                    map_queue_row,
                )
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
    }

    async fn find_by_order_id(&self, order_id: OrderId) -> DomainResult<Option<QueueEntry>> {
        self.with_connection(move |conn| Self::select_by_order_id(conn, order_id)).await
    }

    async fn try_claim(&self, entry: &QueueEntry) -> DomainResult<Option<QueueEntry>> {
        let (sync_id, version, status) = (entry.id, entry.version, entry.status);
        self.with_connection(move |conn| {
            let claimed = conn
                .execute(QUEUE_CLAIM_SQL, params![now_millis(), sync_id, version, status.as_str()])
                .map_err(map_sql_error)?;
            if claimed == 0 {
                return Ok(None);
            }
            Self::select_by_sync_id(conn, sync_id).map(Some)
        })
        .await
    }

    async fn update(&self, entry: &QueueEntry) -> DomainResult<QueueEntry> {
        let entry = entry.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let updated = tx
                .execute(
                    QUEUE_UPDATE_SQL,
                    params![
                        entry.status.as_str(),
                        entry.fail_count,
                        entry.external_order_id,
                        now_millis(),
                        entry.id,
                        entry.version
                    ],
                )
                .map_err(map_sql_error)?;

            if updated == 0 {
                let current = tx
                    .query_row(QUEUE_SELECT_BY_ID_SQL, params![entry.id], map_queue_row)
                    .optional()
                    .map_err(map_sql_error)?;
                return Err(match current {
                    Some(current) => ReturnSyncError::Conflict(format!(
                        "queue entry {} is at version {} (expected {}), status {}",
                        entry.id, current.version, entry.version, current.status
                    )),
                    None => ReturnSyncError::NotFound(format!("queue entry {}", entry.id)),
                });
            }

            let saved = Self::select_by_sync_id(&tx, entry.id)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(saved)
        })
        .await
    }

    async fn requeue(&self, order_id: OrderId, status: QueueStatus) -> DomainResult<QueueEntry> {
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute(QUEUE_REQUEUE_SQL, params![order_id, status.as_str(), now_millis()])
                .map_err(map_sql_error)?;
            let entry = Self::select_by_order_id(&tx, order_id)?.ok_or_else(|| {
                ReturnSyncError::Internal(format!("queue entry for order {order_id} vanished"))
            })?;
            tx.commit().map_err(map_sql_error)?;
            Ok(entry)
        })
        .await
    }

    async fn count_by_status(&self) -> DomainResult<BTreeMap<QueueStatus, u64>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(QUEUE_COUNT_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(map_sql_error)?;

            let mut counts = BTreeMap::new();
            for row in rows {
                let (raw, count) = row.map_err(map_sql_error)?;
                let status = parse_status("aggregate", &raw);
                *counts.entry(status).or_insert(0) += u64::try_from(count).unwrap_or(0);
            }
            Ok(counts)
        })
        .await
    }
}

const QUEUE_SELECT_BY_ORDER_SQL: &str = "SELECT
        sync_id, order_id, status, fail_count, external_order_id, version, created_at, updated_at
    FROM order_sync_queue
    WHERE order_id = ?1";

const QUEUE_SELECT_BY_ID_SQL: &str = "SELECT
        sync_id, order_id, status, fail_count, external_order_id, version, created_at, updated_at
    FROM order_sync_queue
    WHERE sync_id = ?1";

const QUEUE_INSERT_IF_ABSENT_SQL: &str = "INSERT INTO order_sync_queue (
        order_id, status, fail_count, version, created_at, updated_at
    ) VALUES (?1, ?2, 0, 0, ?3, ?3)
    ON CONFLICT(order_id) DO NOTHING";

const QUEUE_BATCH_SQL: &str = "SELECT
        sync_id, order_id, status, fail_count, external_order_id, version, created_at, updated_at
    FROM order_sync_queue
    WHERE status = ?1
      AND (?2 IS NULL OR fail_count <= ?2)
    ORDER BY fail_count ASC, created_at ASC, sync_id ASC
    LIMIT ?3";

const QUEUE_CLAIM_SQL: &str = "UPDATE order_sync_queue
    SET version = version + 1, updated_at = ?1
    WHERE sync_id = ?2 AND version = ?3 AND status = ?4";

const QUEUE_UPDATE_SQL: &str = "UPDATE order_sync_queue
    SET status = ?1, fail_count = ?2, external_order_id = ?3,
        version = version + 1, updated_at = ?4
    WHERE sync_id = ?5 AND version = ?6";

const QUEUE_REQUEUE_SQL: &str = "INSERT INTO order_sync_queue (
        order_id, status, fail_count, version, created_at, updated_at
    ) VALUES (?1, ?2, 0, 0, ?3, ?3)
    ON CONFLICT(order_id) DO UPDATE SET
        status = excluded.status,
        fail_count = 0,
        version = order_sync_queue.version + 1,
        updated_at = excluded.updated_at";

const QUEUE_COUNT_SQL: &str =
    "SELECT status, COUNT(*) FROM order_sync_queue GROUP BY status ORDER BY status";

fn map_queue_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    let id: i64 = row.get(0)?;
    let status_raw: String = row.get(2)?;

    Ok(QueueEntry {
        id,
        order_id: row.get(1)?,
        status: parse_status(&id.to_string(), &status_raw),
        fail_count: row.get(3)?,
        external_order_id: row.get(4)?,
        version: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Unknown statuses park the row as failed so it stays within the retry
/// budget instead of being pushed again as new.
fn parse_status(id: &str, raw: &str) -> QueueStatus {
    match raw.parse::<QueueStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(
                sync_id = %id,
                raw_status = %raw,
                error = %err,
                "invalid queue status in database, treating as failed"
            );
            QueueStatus::Failed
        }
    }
}

fn map_join_error(err: task::JoinError) -> ReturnSyncError {
    if err.is_cancelled() {
        ReturnSyncError::Internal("queue task cancelled".into())
    } else {
        ReturnSyncError::Internal(format!("queue task panic: {err}"))
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_parked_as_failed() {
        assert_eq!(parse_status("1", "SYNCHED"), QueueStatus::Synched);
        assert_eq!(parse_status("1", "archived"), QueueStatus::Failed);
    }
}
