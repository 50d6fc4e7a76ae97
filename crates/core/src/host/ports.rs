//! Port interfaces for host orders and catalog data
//!
//! The host platform owns this data. Implementations must return snapshots
//! and never expose mutation to the sync core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use returnsync_domain::{
    AttributeDefinition, Category, CategoryId, HostOrder, OrderId, Product, ProductId, Result,
    StoreId, StoreInfo,
};

/// Host order lookups
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Orders with the given ids; unknown ids are silently absent.
    async fn get_by_ids(&self, ids: &[OrderId]) -> Result<Vec<HostOrder>>;

    /// Non-canceled orders, oldest first, optionally created after a cutoff.
    async fn list_backfill_candidates(
        &self,
        created_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<HostOrder>>;
}

/// Catalog lookups used to enrich order lines
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Product as seen from `store_id`.
    async fn product(&self, store_id: StoreId, product_id: ProductId) -> Result<Option<Product>>;

    /// Categories with the given ids.
    async fn categories(&self, ids: &[CategoryId]) -> Result<Vec<Category>>;

    async fn attribute(&self, code: &str) -> Result<Option<AttributeDefinition>>;

    async fn store(&self, store_id: StoreId) -> Result<Option<StoreInfo>>;
}
