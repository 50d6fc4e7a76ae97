//! Order and catalog builders.

use chrono::{TimeZone, Utc};
use returnsync_domain::{
    Address, HostOrder, OrderItem, OrderState, OrderSyncSettings, Product,
};

pub const COMPANY_ID: &str = "42";

pub fn settings() -> OrderSyncSettings {
    OrderSyncSettings {
        company_id: COMPANY_ID.into(),
        enabled: true,
        ..OrderSyncSettings::default()
    }
}

pub fn item(item_id: i64, product_id: i64) -> OrderItem {
    OrderItem {
        item_id,
        parent_item_id: None,
        product_id: Some(product_id),
        product_type: "simple".into(),
        name: Some(format!("Product {product_id}")),
        sku: Some(format!("SKU-{product_id}")),
        qty_ordered: 1.0,
        price: Some(19.99),
    }
}

pub fn order(id: i64) -> HostOrder {
    HostOrder {
        id: Some(id),
        increment_id: format!("1000000{id:02}"),
        store_id: 1,
        state: OrderState::Processing,
        created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).single().unwrap_or_default(),
        currency_code: Some("GBP".into()),
        customer_email: Some("jo@shop.test".into()),
        customer_first_name: Some("Jo".into()),
        customer_last_name: Some("Bloggs".into()),
        billing_address: Some(Address { telephone: Some("07700900000".into()), ..Address::default() }),
        shipping_address: Some(Address {
            city: Some("Leeds".into()),
            postcode: Some("LS1 4AP".into()),
            country_id: Some("GB".into()),
            region: Some("West Yorkshire".into()),
            street: vec!["1 Park Row".into(), String::new()],
            telephone: None,
        }),
        items: vec![item(1, 10)],
    }
}

pub fn canceled(id: i64) -> HostOrder {
    HostOrder { state: OrderState::Canceled, ..order(id) }
}

pub fn product(id: i64) -> Product {
    Product {
        id,
        sku: Some(format!("SKU-{id}")),
        name: Some(format!("Product {id}")),
        url: Some(format!("https://shop.test/product-{id}.html?___store=default")),
        ..Product::default()
    }
}
