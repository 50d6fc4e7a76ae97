//! Shared helpers for infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use returnsync_domain::{Address, HostOrder, OrderItem, OrderState, Product, StoreInfo};
use returnsync_infra::database::{
    DbManager, HostSnapshot, SqliteHostStore, SqliteOrderQueueRepository, StoreProduct,
};
use tempfile::TempDir;

/// Migrated SQLite database that lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("returnsync-test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn queue(&self) -> SqliteOrderQueueRepository {
        SqliteOrderQueueRepository::new(Arc::clone(&self.manager))
    }

    pub fn host(&self) -> SqliteHostStore {
        SqliteHostStore::new(Arc::clone(&self.manager))
    }

    /// Execute raw SQL, for states the repositories never produce.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn order(id: i64, day: u32) -> HostOrder {
    HostOrder {
        id: Some(id),
        increment_id: format!("1000000{id:02}"),
        store_id: 1,
        state: OrderState::Processing,
        created_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).single().expect("valid date"),
        currency_code: Some("EUR".into()),
        customer_email: Some("sam@shop.test".into()),
        customer_first_name: Some("Sam".into()),
        customer_last_name: Some("Doe".into()),
        billing_address: Some(Address {
            telephone: Some("+3531234567".into()),
            ..Address::default()
        }),
        shipping_address: Some(Address {
            city: Some("Dublin".into()),
            postcode: Some("D02 X285".into()),
            country_id: Some("IE".into()),
            region: None,
            street: vec!["5 Main Street".into()],
            telephone: None,
        }),
        items: vec![OrderItem {
            item_id: id * 10,
            parent_item_id: None,
            product_id: Some(7),
            product_type: "simple".into(),
            name: Some("Canvas Tote".into()),
            sku: Some("TOTE-1".into()),
            qty_ordered: 1.0,
            price: Some(12.5),
        }],
    }
}

/// Snapshot with the given orders and the catalog they reference.
pub fn snapshot(orders: Vec<HostOrder>) -> HostSnapshot {
    HostSnapshot {
        orders,
        products: vec![StoreProduct {
            store_id: 1,
            product: Product {
                id: 7,
                sku: Some("TOTE-1".into()),
                name: Some("Canvas Tote".into()),
                url: Some("https://shop.test/tote.html".into()),
                ..Product::default()
            },
        }],
        stores: vec![StoreInfo {
            id: 1,
            root_category_id: Some(2),
            media_base_url: Some("https://shop.test/media/catalog/product".into()),
        }],
        ..HostSnapshot::default()
    }
}
