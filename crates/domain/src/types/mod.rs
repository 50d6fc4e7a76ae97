//! Domain types and models

pub mod catalog;
pub mod order;
pub mod payload;
pub mod queue;

pub use catalog::{AttributeDefinition, AttributeValue, Category, FrontendInput, Product, StoreInfo};
pub use order::{Address, HostOrder, OrderItem, OrderState};
pub use payload::{
    CustomerName, CustomerPayload, DeliveryAddress, Dimensions, OrderLinePayload,
    ProductAttributes, PurchasePayload, PurchaseUpdatePayload,
};
pub use queue::{BatchQuery, QueueEntry, QueueInsert, QueueStatus, SyncWorkflow};

/// Host order primary key.
pub type OrderId = i64;
/// Host store (view) identifier.
pub type StoreId = i64;
/// Host product identifier.
pub type ProductId = i64;
/// Host category identifier.
pub type CategoryId = i64;
