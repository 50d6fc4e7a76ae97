//! Tests for purchase payload building.

mod support;

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use returnsync_core::{BatchContext, PurchasePayloadBuilder};
use returnsync_domain::{
    AttributeDefinition, AttributeValue, Category, FrontendInput, OrderItem, StoreInfo,
};
use serde_json::json;
use support::fixtures::{item, order, product, COMPANY_ID};
use support::repositories::InMemoryCatalog;

fn store() -> StoreInfo {
    StoreInfo {
        id: 1,
        root_category_id: Some(2),
        media_base_url: Some("https://cdn.shop.test/media/".into()),
    }
}

fn builder(catalog: InMemoryCatalog) -> (PurchasePayloadBuilder, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(catalog);
    (PurchasePayloadBuilder::new(catalog.clone(), COMPANY_ID), catalog)
}

#[tokio::test]
async fn builds_order_level_fields() {
    let (builder, _) = builder(InMemoryCatalog::default().with_product(1, product(10)));
    let payload = builder.build_create_payload(&order(7), &mut BatchContext::new()).await.unwrap();

    let body = serde_json::to_value(&payload).unwrap();
    assert_eq!(body["companyId"], "42");
    assert_eq!(body["externalOrderId"], "100000007");
    assert_eq!(body["purchaseDate"], "2024-03-09");
    assert_eq!(body["customer"]["email"], "jo@shop.test");
    assert_eq!(body["customer"]["name"], json!({"firstName": "Jo", "lastName": "Bloggs"}));
    assert_eq!(body["customer"]["mobileNumber"], "07700900000");
    assert_eq!(body["deliveryAddress"]["town"], "Leeds");
    assert_eq!(body["deliveryAddress"]["area"], "West Yorkshire");
    assert_eq!(body["deliveryAddress"]["line1"], "1 Park Row");
    assert!(body["deliveryAddress"].get("line2").is_none());
}

#[tokio::test]
async fn builds_line_fields() {
    let (builder, _) = builder(InMemoryCatalog::default().with_product(1, product(10)));
    let mut order = order(7);
    order.items[0].name = Some("N".repeat(80));
    order.items[0].qty_ordered = 2.5;

    let payload = builder.build_create_payload(&order, &mut BatchContext::new()).await.unwrap();

    let line = &payload.order_lines[0];
    assert_eq!(line.order_line_id, "1000000071");
    assert_eq!(line.product_name.chars().count(), 60);
    assert_eq!(line.quantity, 1);
    assert_eq!(line.price, Some(1999));
    assert_eq!(line.price_currency.as_deref(), Some("GBP"));
    assert_eq!(line.product_url, "https://shop.test/product-10.html");
    assert!(!line.is_not_returnable);
    assert!(line.categories.is_empty());
    assert_eq!(line.attributes, None);
    assert_eq!(line.image_url, None);
}

#[tokio::test]
async fn whole_quantities_pass_through() {
    let (builder, _) = builder(InMemoryCatalog::default().with_product(1, product(10)));
    let mut order = order(7);
    order.items[0].qty_ordered = 3.0;

    let payload = builder.build_create_payload(&order, &mut BatchContext::new()).await.unwrap();
    assert_eq!(payload.order_lines[0].quantity, 3);
}

#[tokio::test]
async fn missing_customer_and_address_use_placeholders() {
    let (builder, _) = builder(InMemoryCatalog::default().with_product(1, product(10)));
    let mut order = order(7);
    order.customer_first_name = None;
    order.customer_last_name = Some("  ".into());
    order.billing_address = None;
    order.shipping_address = None;

    let payload = builder.build_create_payload(&order, &mut BatchContext::new()).await.unwrap();

    assert_eq!(payload.customer.name.first_name, "Guest");
    assert_eq!(payload.customer.name.last_name, None);
    assert_eq!(payload.customer.mobile_number, None);
    let address = serde_json::to_value(&payload.delivery_address).unwrap();
    assert_eq!(address, json!({"town": " ", "postcode": " ", "country": "  ", "line1": " "}));
}

#[tokio::test]
async fn empty_postcode_becomes_single_space() {
    let (builder, _) = builder(InMemoryCatalog::default());
    let mut order = order(7);
    if let Some(shipping) = order.shipping_address.as_mut() {
        shipping.postcode = Some(String::new());
    }

    let update = builder.build_update_payload(&order);
    assert_eq!(update.delivery_address.postcode, " ");
    assert_eq!(update.delivery_address.town, "Leeds");
}

#[tokio::test]
async fn vanished_products_drop_their_line() {
    let (builder, _) = builder(InMemoryCatalog::default().with_product(1, product(10)));
    let mut order = order(7);
    order.items.push(item(2, 99));

    let payload = builder.build_create_payload(&order, &mut BatchContext::new()).await.unwrap();
    assert_eq!(payload.order_lines.len(), 1);
    assert_eq!(payload.order_lines[0].sku, "SKU-10");
}

#[tokio::test]
async fn categories_are_limited_to_store_root() {
    let mut tee = product(10);
    tee.category_ids = vec![14, 15, 30];
    let catalog = InMemoryCatalog::default()
        .with_product(1, tee)
        .with_store(store())
        .with_category(Category { id: 14, name: "Tops".into(), path: "1/2/14".into() })
        .with_category(Category { id: 15, name: "Sale".into(), path: "1/2/14/15".into() })
        .with_category(Category { id: 30, name: "Other Site".into(), path: "1/3/30".into() });
    let (builder, _) = builder(catalog);

    let payload = builder.build_create_payload(&order(7), &mut BatchContext::new()).await.unwrap();
    assert_eq!(payload.order_lines[0].categories, vec!["Tops".to_string(), "Sale".to_string()]);
}

#[tokio::test]
async fn attributes_resolve_option_labels() {
    let mut tee = product(10);
    tee.attributes = BTreeMap::from([
        ("size".to_string(), AttributeValue::Text("5".into())),
        ("colour".to_string(), AttributeValue::Text("7,9".into())),
        ("weight".to_string(), AttributeValue::Text("0.4".into())),
        ("length".to_string(), AttributeValue::Number(30.0)),
        ("returns_excluded".to_string(), AttributeValue::Text("1".into())),
    ]);
    let catalog = InMemoryCatalog::default()
        .with_product(1, tee)
        .with_attribute(AttributeDefinition {
            code: "size".into(),
            frontend_input: FrontendInput::Select,
            options: BTreeMap::from([("5".to_string(), "Medium".to_string())]),
        })
        .with_attribute(AttributeDefinition {
            code: "colour".into(),
            frontend_input: FrontendInput::Multiselect,
            options: BTreeMap::from([
                ("7".to_string(), "Red".to_string()),
                ("9".to_string(), "Blue".to_string()),
            ]),
        });
    let (builder, _) = builder(catalog);

    let payload = builder.build_create_payload(&order(7), &mut BatchContext::new()).await.unwrap();

    let line = &payload.order_lines[0];
    assert!(line.is_not_returnable);
    let attributes = serde_json::to_value(&line.attributes).unwrap();
    assert_eq!(
        attributes,
        json!({
            "size": "Medium",
            "weight": 0.4,
            "color": "Red, Blue",
            "dimensions": {"length": 30.0, "width": 0.0, "height": 0.0}
        })
    );
}

#[tokio::test]
async fn zero_weight_is_left_out() {
    let mut tee = product(10);
    tee.attributes = BTreeMap::from([
        ("size".to_string(), AttributeValue::Text("S".into())),
        ("weight".to_string(), AttributeValue::Text("0".into())),
    ]);
    let (builder, _) = builder(InMemoryCatalog::default().with_product(1, tee));

    let payload = builder.build_create_payload(&order(7), &mut BatchContext::new()).await.unwrap();

    let attributes = serde_json::to_value(&payload.order_lines[0].attributes).unwrap();
    assert_eq!(attributes, json!({"size": "S"}));
}

#[tokio::test]
async fn configurable_lines_take_child_attributes() {
    let mut parent_product = product(10);
    parent_product.attributes.insert("weight".into(), AttributeValue::Number(1.0));
    let mut child_product = product(11);
    child_product.attributes.insert("size".into(), AttributeValue::Text("XL".into()));
    let catalog = InMemoryCatalog::default()
        .with_product(1, parent_product)
        .with_product(1, child_product);
    let (builder, _) = builder(catalog);

    let mut order = order(7);
    order.items[0].product_type = "configurable".into();
    order.items.push(OrderItem { parent_item_id: Some(1), ..item(2, 11) });

    let payload = builder.build_create_payload(&order, &mut BatchContext::new()).await.unwrap();

    assert_eq!(payload.order_lines.len(), 1);
    let attributes = payload.order_lines[0].attributes.clone().unwrap();
    assert_eq!(attributes.size.as_deref(), Some("XL"));
    assert_eq!(attributes.weight, Some(1.0));
}

#[tokio::test]
async fn image_url_joins_media_base() {
    let mut tee = product(10);
    tee.image = Some("/t/e/tee.jpg".into());
    let mut placeholder = product(11);
    placeholder.image = Some("no_selection".into());
    let catalog = InMemoryCatalog::default()
        .with_product(1, tee)
        .with_product(1, placeholder)
        .with_store(store());
    let (builder, _) = builder(catalog);

    let mut order = order(7);
    order.items.push(item(2, 11));
    let payload = builder.build_create_payload(&order, &mut BatchContext::new()).await.unwrap();

    assert_eq!(
        payload.order_lines[0].image_url.as_deref(),
        Some("https://cdn.shop.test/media/catalog/product/t/e/tee.jpg")
    );
    assert_eq!(payload.order_lines[1].image_url, None);
}

#[tokio::test]
async fn batch_context_memoises_catalog_lookups() {
    let mut tee = product(10);
    tee.category_ids = vec![14];
    let catalog = InMemoryCatalog::default()
        .with_product(1, tee)
        .with_store(store())
        .with_category(Category { id: 14, name: "Tops".into(), path: "1/2/14".into() });
    let (builder, catalog) = builder(catalog);
    let mut context = BatchContext::new();

    builder.build_create_payload(&order(7), &mut context).await.unwrap();
    builder.build_create_payload(&order(8), &mut context).await.unwrap();

    assert_eq!(catalog.product_lookups.load(Ordering::SeqCst), 1);
    assert_eq!(catalog.category_lookups.load(Ordering::SeqCst), 1);
}
