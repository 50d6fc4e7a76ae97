//! In-memory implementations of the core ports.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use returnsync_core::{CatalogRepository, OrderQueueRepository, OrderRepository, ReturnsApi};
use returnsync_domain::{
    AttributeDefinition, BatchQuery, Category, CategoryId, HostOrder, OrderId, Product,
    ProductId, QueueEntry, QueueInsert, QueueStatus, Result as DomainResult, ReturnSyncError,
    StoreId, StoreInfo,
};
use serde_json::Value;
use tokio::sync::Mutex;

/// Queue store that honours ordering, fail caps and optimistic versions.
#[derive(Default)]
pub struct InMemoryQueue {
    entries: Mutex<Vec<QueueEntry>>,
    clock: AtomicI64,
    /// Number of successful claims, for asserting dispatch counts.
    claims: AtomicI64,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()), clock: AtomicI64::new(1_000), claims: AtomicI64::new(0) }
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Seed an entry directly, bypassing the enqueue rules.
    pub async fn seed(&self, order_id: OrderId, status: QueueStatus, fail_count: u32) -> QueueEntry {
        let now = self.tick();
        let mut entries = self.entries.lock().await;
        let entry = QueueEntry {
            id: i64::try_from(entries.len()).unwrap_or_default() + 1,
            order_id,
            status,
            fail_count,
            external_order_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        entries.push(entry.clone());
        entry
    }

    pub async fn get(&self, order_id: OrderId) -> Option<QueueEntry> {
        self.entries.lock().await.iter().find(|e| e.order_id == order_id).cloned()
    }

    pub async fn all(&self) -> Vec<QueueEntry> {
        self.entries.lock().await.clone()
    }

    pub fn claim_count(&self) -> i64 {
        self.claims.load(Ordering::SeqCst)
    }

    /// Simulate another writer touching the row.
    pub async fn bump_version(&self, order_id: OrderId) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.iter_mut().find(|e| e.order_id == order_id) {
            entry.version += 1;
        }
    }
}

#[async_trait]
impl OrderQueueRepository for InMemoryQueue {
    async fn insert_if_absent(
        &self,
        order_id: OrderId,
        initial_status: QueueStatus,
    ) -> DomainResult<QueueInsert> {
        if let Some(entry) = self.get(order_id).await {
            return Ok(QueueInsert { entry, created: false });
        }
        let entry = self.seed(order_id, initial_status, 0).await;
        Ok(QueueInsert { entry, created: true })
    }

    async fn find_batch(&self, query: BatchQuery) -> DomainResult<Vec<QueueEntry>> {
        let mut matching: Vec<QueueEntry> =
            self.entries.lock().await.iter().filter(|e| query.matches(e)).cloned().collect();
        matching.sort_by_key(|e| (e.fail_count, e.created_at, e.id));
        matching.truncate(query.limit);
        Ok(matching)
    }

    async fn find_by_order_id(&self, order_id: OrderId) -> DomainResult<Option<QueueEntry>> {
        Ok(self.get(order_id).await)
    }

    async fn try_claim(&self, entry: &QueueEntry) -> DomainResult<Option<QueueEntry>> {
        let now = self.tick();
        let mut entries = self.entries.lock().await;
        let Some(stored) = entries.iter_mut().find(|e| e.id == entry.id) else {
            return Ok(None);
        };
        if stored.version != entry.version || stored.status != entry.status {
            return Ok(None);
        }
        stored.version += 1;
        stored.updated_at = now;
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(Some(stored.clone()))
    }

    async fn update(&self, entry: &QueueEntry) -> DomainResult<QueueEntry> {
        let now = self.tick();
        let mut entries = self.entries.lock().await;
        let stored = entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| ReturnSyncError::NotFound(format!("queue entry {}", entry.id)))?;
        if stored.version != entry.version {
            return Err(ReturnSyncError::Conflict(format!("queue entry {} is stale", entry.id)));
        }
        stored.status = entry.status;
        stored.fail_count = entry.fail_count;
        stored.external_order_id.clone_from(&entry.external_order_id);
        stored.version += 1;
        stored.updated_at = now;
        Ok(stored.clone())
    }

    async fn requeue(&self, order_id: OrderId, status: QueueStatus) -> DomainResult<QueueEntry> {
        let now = self.tick();
        {
            let mut entries = self.entries.lock().await;
            if let Some(stored) = entries.iter_mut().find(|e| e.order_id == order_id) {
                stored.status = status;
                stored.fail_count = 0;
                stored.version += 1;
                stored.updated_at = now;
                return Ok(stored.clone());
            }
        }
        Ok(self.seed(order_id, status, 0).await)
    }

    async fn count_by_status(&self) -> DomainResult<BTreeMap<QueueStatus, u64>> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.lock().await.iter() {
            *counts.entry(entry.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Fixed set of host orders.
#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<Vec<HostOrder>>,
}

impl InMemoryOrders {
    pub fn new(orders: Vec<HostOrder>) -> Self {
        Self { orders: Mutex::new(orders) }
    }

    pub async fn replace(&self, order: HostOrder) {
        let mut orders = self.orders.lock().await;
        orders.retain(|o| o.id != order.id);
        orders.push(order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn get_by_ids(&self, ids: &[OrderId]) -> DomainResult<Vec<HostOrder>> {
        Ok(self
            .orders
            .lock()
            .await
            .iter()
            .filter(|o| o.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn list_backfill_candidates(
        &self,
        created_after: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<HostOrder>> {
        let mut orders: Vec<HostOrder> = self
            .orders
            .lock()
            .await
            .iter()
            .filter(|o| !o.is_canceled())
            .filter(|o| created_after.map_or(true, |cutoff| o.created_at > cutoff))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }
}

/// Catalog backed by hash maps, counting lookups to verify caching.
#[derive(Default)]
pub struct InMemoryCatalog {
    pub products: HashMap<(StoreId, ProductId), Product>,
    pub categories: HashMap<CategoryId, Category>,
    pub attributes: HashMap<String, AttributeDefinition>,
    pub stores: HashMap<StoreId, StoreInfo>,
    pub product_lookups: AtomicI64,
    pub category_lookups: AtomicI64,
}

impl InMemoryCatalog {
    pub fn with_product(mut self, store_id: StoreId, product: Product) -> Self {
        self.products.insert((store_id, product.id), product);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.insert(category.id, category);
        self
    }

    pub fn with_attribute(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.insert(definition.code.clone(), definition);
        self
    }

    pub fn with_store(mut self, store: StoreInfo) -> Self {
        self.stores.insert(store.id, store);
        self
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn product(&self, store_id: StoreId, product_id: ProductId) -> DomainResult<Option<Product>> {
        self.product_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.get(&(store_id, product_id)).cloned())
    }

    async fn categories(&self, ids: &[CategoryId]) -> DomainResult<Vec<Category>> {
        self.category_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(ids.iter().filter_map(|id| self.categories.get(id)).cloned().collect())
    }

    async fn attribute(&self, code: &str) -> DomainResult<Option<AttributeDefinition>> {
        Ok(self.attributes.get(code).cloned())
    }

    async fn store(&self, store_id: StoreId) -> DomainResult<Option<StoreInfo>> {
        Ok(self.stores.get(&store_id).cloned())
    }
}

/// A recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: &'static str,
    pub path: String,
    pub scope: String,
    pub body: Option<Value>,
}

/// API double replaying scripted responses in call order.
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<VecDeque<DomainResult<Value>>>,
    token: Mutex<Option<DomainResult<String>>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedApi {
    pub fn new(responses: Vec<DomainResult<Value>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            token: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub async fn set_token_result(&self, result: DomainResult<String>) {
        *self.token.lock().await = Some(result);
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    async fn next(&self, call: ApiCall) -> DomainResult<Value> {
        self.calls.lock().await.push(call);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ReturnSyncError::Internal("no scripted response left".into())))
    }
}

#[async_trait]
impl ReturnsApi for ScriptedApi {
    async fn access_token(&self, _scope: &str) -> DomainResult<String> {
        self.token.lock().await.clone().unwrap_or_else(|| Ok("token".into()))
    }

    async fn post(&self, path: &str, scope: &str, body: Option<&Value>) -> DomainResult<Value> {
        self.next(ApiCall {
            method: "POST",
            path: path.to_string(),
            scope: scope.to_string(),
            body: body.cloned(),
        })
        .await
    }

    async fn patch(&self, path: &str, scope: &str, body: &Value) -> DomainResult<Value> {
        self.next(ApiCall {
            method: "PATCH",
            path: path.to_string(),
            scope: scope.to_string(),
            body: Some(body.clone()),
        })
        .await
    }
}
