//! Wire payloads for the purchases endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{BLANK_COUNTRY, BLANK_FIELD};

/// Body of `POST /v1/purchases/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePayload {
    pub company_id: String,
    pub external_order_id: String,
    /// `YYYY-MM-DD`.
    pub purchase_date: String,
    pub order_lines: Vec<OrderLinePayload>,
    pub customer: CustomerPayload,
    pub delivery_address: DeliveryAddress,
}

/// Body of the purchase update call; only the address may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseUpdatePayload {
    pub delivery_address: DeliveryAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
    pub order_line_id: String,
    pub product_name: String,
    pub product_url: String,
    pub is_not_returnable: bool,
    pub quantity: i64,
    pub sku: String,
    /// Minor currency units.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub price_currency: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attributes: Option<ProductAttributes>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
}

/// Descriptive product attributes forwarded with an order line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAttributes {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dimensions: Option<Dimensions>,
}

impl ProductAttributes {
    pub const fn is_empty(&self) -> bool {
        self.size.is_none()
            && self.weight.is_none()
            && self.color.is_none()
            && self.dimensions.is_none()
    }

    /// Overlay every attribute `other` defines on top of `self`.
    pub fn merge_from(&mut self, other: Self) {
        if other.size.is_some() {
            self.size = other.size;
        }
        if other.weight.is_some() {
            self.weight = other.weight;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
        if other.dimensions.is_some() {
            self.dimensions = other.dimensions;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    pub email: String,
    pub name: CustomerName,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mobile_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerName {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_name: Option<String>,
}

/// Delivery address; street lines serialize as `line1`, `line2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub town: String,
    pub postcode: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub area: Option<String>,
    #[serde(flatten)]
    pub lines: BTreeMap<String, String>,
}

impl DeliveryAddress {
    /// Placeholder address accepted by the API when the order has none.
    pub fn placeholder() -> Self {
        let mut lines = BTreeMap::new();
        lines.insert("line1".to_string(), BLANK_FIELD.to_string());
        Self {
            town: BLANK_FIELD.to_string(),
            postcode: BLANK_FIELD.to_string(),
            country: BLANK_COUNTRY.to_string(),
            area: None,
            lines,
        }
    }
}
