//! Host data snapshots stored in SQLite.
//!
//! The host platform pushes orders and catalog data as JSON documents
//! ([`HostSnapshot`]). They are stored whole in `host_*` tables, with the few
//! columns the queries filter on lifted out, and served back through the
//! read-only host ports.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use returnsync_core::{CatalogRepository, OrderRepository};
use returnsync_domain::{
    AttributeDefinition, Category, CategoryId, HostOrder, OrderId, OrderState, Product,
    ProductId, Result as DomainResult, ReturnSyncError, StoreId, StoreInfo,
};
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, info};

use super::manager::{map_sql_error, DbManager, SqliteConnection};

/// Product as exported for one store view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub store_id: StoreId,
    #[serde(flatten)]
    pub product: Product,
}

/// Document pushed by the host integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSnapshot {
    pub orders: Vec<HostOrder>,
    pub products: Vec<StoreProduct>,
    pub categories: Vec<Category>,
    pub attributes: Vec<AttributeDefinition>,
    pub stores: Vec<StoreInfo>,
}

/// An imported order next to the version it replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderChange {
    pub order: HostOrder,
    pub previous: Option<HostOrder>,
}

impl OrderChange {
    /// The order moved into the canceled state with this import.
    pub fn became_canceled(&self) -> bool {
        self.order.is_canceled() && self.previous.as_ref().is_some_and(|prev| !prev.is_canceled())
    }

    /// The shipping address differs from the stored one.
    pub fn shipping_changed(&self) -> bool {
        self.previous
            .as_ref()
            .is_some_and(|prev| prev.shipping_address != self.order.shipping_address)
    }
}

/// Row counts written by [`SqliteHostStore::import`], plus the order diffs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub orders: usize,
    pub products: usize,
    pub categories: usize,
    pub attributes: usize,
    pub stores: usize,
    pub changes: Vec<OrderChange>,
}

/// Host snapshot store implementing [`OrderRepository`] and
/// [`CatalogRepository`].
pub struct SqliteHostStore {
    db: Arc<DbManager>,
}

impl SqliteHostStore {
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

    /// Upsert every record of `snapshot` in one transaction.
    ///
    /// Orders without an id cannot be addressed later and are rejected. Each
    /// order is returned with the payload it replaced so callers can tell a
    /// real host event from a repeated snapshot.
    pub async fn import(&self, snapshot: HostSnapshot) -> DomainResult<ImportSummary> {
        if let Some(order) = snapshot.orders.iter().find(|order| order.id.is_none()) {
            return Err(ReturnSyncError::InvalidInput(format!(
                "order {} has no id",
                order.increment_id
            )));
        }

        let summary = self
            .with_connection(move |conn| {
                let tx = conn.transaction().map_err(map_sql_error)?;
                let mut changes = Vec::with_capacity(snapshot.orders.len());
                for order in &snapshot.orders {
                    let previous = tx
                        .query_row(ORDER_BY_ID_SQL, params![order.id], |row| row.get::<_, String>(0))
                        .optional()
                        .map_err(map_sql_error)?
                        .map(|payload| decode::<HostOrder>("order", &payload))
                        .transpose()?;
                    upsert_order(&tx, order)?;
                    changes.push(OrderChange { order: order.clone(), previous });
                }
                for entry in &snapshot.products {
                    tx.execute(
                        PRODUCT_UPSERT_SQL,
                        params![entry.store_id, entry.product.id, encode(&entry.product)?],
                    )
                    .map_err(map_sql_error)?;
                }
                for category in &snapshot.categories {
                    tx.execute(CATEGORY_UPSERT_SQL, params![category.id, encode(category)?])
                        .map_err(map_sql_error)?;
                }
                for attribute in &snapshot.attributes {
                    tx.execute(ATTRIBUTE_UPSERT_SQL, params![attribute.code, encode(attribute)?])
                        .map_err(map_sql_error)?;
                }
                for store in &snapshot.stores {
                    tx.execute(STORE_UPSERT_SQL, params![store.id, encode(store)?])
                        .map_err(map_sql_error)?;
                }
                tx.commit().map_err(map_sql_error)?;

                Ok(ImportSummary {
                    orders: snapshot.orders.len(),
                    products: snapshot.products.len(),
                    categories: snapshot.categories.len(),
                    attributes: snapshot.attributes.len(),
                    stores: snapshot.stores.len(),
                    changes,
                })
            })
            .await?;

        info!(
            orders = summary.orders,
            products = summary.products,
            categories = summary.categories,
            attributes = summary.attributes,
            stores = summary.stores,
            "host snapshot imported"
        );
        Ok(summary)
    }

    pub async fn get_order(&self, order_id: OrderId) -> DomainResult<Option<HostOrder>> {
        self.with_connection(move |conn| {
            conn.query_row(ORDER_BY_ID_SQL, params![order_id], |row| row.get::<_, String>(0))
                .optional()
                .map_err(map_sql_error)?
                .map(|payload| decode::<HostOrder>("order", &payload))
                .transpose()
        })
        .await
    }

    /// Flip a stored order to canceled, as the host does when a customer or
    /// admin cancels it.
    pub async fn mark_canceled(&self, order_id: OrderId) -> DomainResult<HostOrder> {
        let order = self
            .with_connection(move |conn| {
                let tx = conn.transaction().map_err(map_sql_error)?;
                let payload: String = tx
                    .query_row(ORDER_BY_ID_SQL, params![order_id], |row| row.get(0))
                    .optional()
                    .map_err(map_sql_error)?
                    .ok_or_else(|| ReturnSyncError::NotFound(format!("order {order_id}")))?;
                let mut order = decode::<HostOrder>("order", &payload)?;
                order.state = OrderState::Canceled;
                upsert_order(&tx, &order)?;
                tx.commit().map_err(map_sql_error)?;
                Ok(order)
            })
            .await?;

        debug!(order_id, increment_id = %order.increment_id, "order marked canceled");
        Ok(order)
    }
}

#[async_trait]
impl OrderRepository for SqliteHostStore {
    async fn get_by_ids(&self, ids: &[OrderId]) -> DomainResult<Vec<HostOrder>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.to_vec();
        self.with_connection(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!("SELECT payload FROM host_orders WHERE order_id IN ({placeholders})");
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let payloads = stmt
                .query_map(params_from_iter(ids.iter()), |row| row.get::<_, String>(0))
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            payloads.iter().map(|payload| decode("order", payload)).collect()
        })
        .await
    }

    async fn list_backfill_candidates(
        &self,
        created_after: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<HostOrder>> {
        let cutoff = created_after.map(|at| at.timestamp_millis());
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(ORDER_BACKFILL_SQL).map_err(map_sql_error)?;
            let payloads = stmt
                .query_map(
                    params![OrderState::Canceled.as_str(), cutoff],
                    |row| row.get::<_, String>(0),
                )
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            payloads.iter().map(|payload| decode("order", payload)).collect()
        })
        .await
    }
}

#[async_trait]
impl CatalogRepository for SqliteHostStore {
    async fn product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> DomainResult<Option<Product>> {
        self.with_connection(move |conn| {
            fetch_document(conn, PRODUCT_BY_ID_SQL, params![store_id, product_id], "product")
        })
        .await
    }

    async fn categories(&self, ids: &[CategoryId]) -> DomainResult<Vec<Category>> {
        let ids = ids.to_vec();
        self.with_connection(move |conn| {
            let mut categories = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(category) =
                    fetch_document(conn, CATEGORY_BY_ID_SQL, params![id], "category")?
                {
                    categories.push(category);
                }
            }
            Ok(categories)
        })
        .await
    }

    async fn attribute(&self, code: &str) -> DomainResult<Option<AttributeDefinition>> {
        let code = code.to_string();
        self.with_connection(move |conn| {
            fetch_document(conn, ATTRIBUTE_BY_CODE_SQL, params![code], "attribute")
        })
        .await
    }

    async fn store(&self, store_id: StoreId) -> DomainResult<Option<StoreInfo>> {
        self.with_connection(move |conn| {
            fetch_document(conn, STORE_BY_ID_SQL, params![store_id], "store")
        })
        .await
    }
}

const ORDER_UPSERT_SQL: &str = "INSERT INTO host_orders (
        order_id, increment_id, store_id, state, created_at, payload
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(order_id) DO UPDATE SET
        increment_id = excluded.increment_id,
        store_id = excluded.store_id,
        state = excluded.state,
        created_at = excluded.created_at,
        payload = excluded.payload";

const ORDER_BY_ID_SQL: &str = "SELECT payload FROM host_orders WHERE order_id = ?1";

const ORDER_BACKFILL_SQL: &str = "SELECT payload FROM host_orders
    WHERE state != ?1
      AND (?2 IS NULL OR created_at > ?2)
    ORDER BY created_at ASC, order_id ASC";

const PRODUCT_UPSERT_SQL: &str =
    "INSERT OR REPLACE INTO host_products (store_id, product_id, payload) VALUES (?1, ?2, ?3)";

const PRODUCT_BY_ID_SQL: &str =
    "SELECT payload FROM host_products WHERE store_id = ?1 AND product_id = ?2";

const CATEGORY_UPSERT_SQL: &str =
    "INSERT OR REPLACE INTO host_categories (category_id, payload) VALUES (?1, ?2)";

const CATEGORY_BY_ID_SQL: &str = "SELECT payload FROM host_categories WHERE category_id = ?1";

const ATTRIBUTE_UPSERT_SQL: &str =
    "INSERT OR REPLACE INTO host_attributes (code, payload) VALUES (?1, ?2)";

const ATTRIBUTE_BY_CODE_SQL: &str = "SELECT payload FROM host_attributes WHERE code = ?1";

const STORE_UPSERT_SQL: &str =
    "INSERT OR REPLACE INTO host_stores (store_id, payload) VALUES (?1, ?2)";

const STORE_BY_ID_SQL: &str = "SELECT payload FROM host_stores WHERE store_id = ?1";

fn upsert_order(conn: &rusqlite::Connection, order: &HostOrder) -> DomainResult<()> {
    let order_id = order
        .id
        .ok_or_else(|| ReturnSyncError::InvalidInput(format!("order {} has no id", order.increment_id)))?;
    conn.execute(
        ORDER_UPSERT_SQL,
        params![
            order_id,
            order.increment_id,
            order.store_id,
            order.state.as_str(),
            order.created_at.timestamp_millis(),
            encode(order)?
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn fetch_document<T: DeserializeOwned>(
    conn: &rusqlite::Connection,
    sql: &str,
    params: impl rusqlite::Params,
    kind: &str,
) -> DomainResult<Option<T>> {
    conn.query_row(sql, params, |row| row.get::<_, String>(0))
        .optional()
        .map_err(map_sql_error)?
        .map(|payload| decode(kind, &payload))
        .transpose()
}

fn encode<T: Serialize>(value: &T) -> DomainResult<String> {
    serde_json::to_string(value)
        .map_err(|err| ReturnSyncError::Internal(format!("failed to encode snapshot: {err}")))
}

fn decode<T: DeserializeOwned>(kind: &str, payload: &str) -> DomainResult<T> {
    serde_json::from_str(payload)
        .map_err(|err| ReturnSyncError::Database(format!("corrupt {kind} snapshot: {err}")))
}

fn map_join_error(err: task::JoinError) -> ReturnSyncError {
    if err.is_cancelled() {
        ReturnSyncError::Internal("host store task cancelled".into())
    } else {
        ReturnSyncError::Internal(format!("host store task panic: {err}"))
    }
}
