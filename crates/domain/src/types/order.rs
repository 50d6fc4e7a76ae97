//! Read-only snapshots of host orders.
//!
//! The host platform owns these records; the sync core only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, ProductId, StoreId};

/// Host order state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    New,
    PendingPayment,
    Processing,
    Complete,
    Closed,
    Canceled,
    Holded,
    PaymentReview,
    #[serde(other)]
    Other,
}

crate::impl_domain_status_conversions!(OrderState {
    New => "new",
    PendingPayment => "pending_payment",
    Processing => "processing",
    Complete => "complete",
    Closed => "closed",
    Canceled => "canceled",
    Holded => "holded",
    PaymentReview => "payment_review",
    Other => "other",
});

/// Order as exported by the host platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostOrder {
    /// Missing until the host has persisted the order.
    #[serde(default)]
    pub id: Option<OrderId>,
    /// Human-readable order number, used as the external order id.
    pub increment_id: String,
    pub store_id: StoreId,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_first_name: Option<String>,
    #[serde(default)]
    pub customer_last_name: Option<String>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl HostOrder {
    pub fn is_canceled(&self) -> bool {
        self.state == OrderState::Canceled
    }

    /// Top-level line items; children of configurable items are excluded.
    pub fn visible_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|item| item.parent_item_id.is_none())
    }

    /// Child items attached to `parent_item_id`.
    pub fn children_of(&self, parent_item_id: i64) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(move |item| item.parent_item_id == Some(parent_item_id))
    }
}

/// Line item of a host order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: i64,
    #[serde(default)]
    pub parent_item_id: Option<i64>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub qty_ordered: f64,
    #[serde(default)]
    pub price: Option<f64>,
}

impl OrderItem {
    pub fn is_configurable(&self) -> bool {
        self.product_type.eq_ignore_ascii_case("configurable")
    }
}

/// Billing or shipping address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub street: Vec<String>,
    #[serde(default)]
    pub telephone: Option<String>,
}
