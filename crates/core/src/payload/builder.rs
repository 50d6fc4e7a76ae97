//! Purchase payload builder
//!
//! Turns a host order snapshot into the JSON bodies of the purchase create
//! and update calls. Catalog lookups go through [`CatalogRepository`] and are
//! memoised in a [`BatchContext`] that lives for one scheduled run.
//!
//! Missing catalog data never fails the build: a vanished product drops its
//! line, a missing store or root category yields no categories and no image.
//! Repository errors are propagated.

use std::collections::HashMap;
use std::sync::Arc;

use returnsync_domain::constants::{
    GUEST_FIRST_NAME, MAX_NAME_LENGTH, MAX_SKU_LENGTH, NO_SELECTION_IMAGE,
};
use returnsync_domain::{
    AttributeDefinition, CustomerName, CustomerPayload, DeliveryAddress, Dimensions,
    FrontendInput, HostOrder, OrderItem, OrderLinePayload, Product, ProductAttributes, ProductId,
    PurchasePayload, PurchaseUpdatePayload, Result, StoreId, StoreInfo,
};
use tracing::debug;

use super::fields;
use crate::host::ports::CatalogRepository;

type ProductKey = (StoreId, ProductId);

/// Lookup caches scoped to a single batch run.
///
/// Keys always include the store so data resolved for one store view is
/// never served to another.
#[derive(Debug, Default)]
pub struct BatchContext {
    products: HashMap<ProductKey, Option<Product>>,
    stores: HashMap<StoreId, Option<StoreInfo>>,
    attribute_definitions: HashMap<String, Option<AttributeDefinition>>,
    categories: HashMap<ProductKey, Vec<String>>,
    attributes: HashMap<ProductKey, ProductAttributes>,
    images: HashMap<ProductKey, Option<String>>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builds purchase payloads for one company.
#[derive(Clone)]
pub struct PurchasePayloadBuilder {
    catalog: Arc<dyn CatalogRepository>,
    company_id: String,
}

impl PurchasePayloadBuilder {
    pub fn new(catalog: Arc<dyn CatalogRepository>, company_id: impl Into<String>) -> Self {
        Self { catalog, company_id: company_id.into() }
    }

    /// Body of the purchase create call.
    pub async fn build_create_payload(
        &self,
        order: &HostOrder,
        context: &mut BatchContext,
    ) -> Result<PurchasePayload> {
        let mut order_lines = Vec::new();
        for item in order.visible_items() {
            if let Some(line) = self.build_order_line(order, item, context).await? {
                order_lines.push(line);
            }
        }

        Ok(PurchasePayload {
            company_id: fields::string(Some(&self.company_id)),
            external_order_id: fields::string(Some(&order.increment_id)),
            purchase_date: order.created_at.format("%Y-%m-%d").to_string(),
            order_lines,
            customer: customer(order),
            delivery_address: delivery_address(order),
        })
    }

    /// Body of the purchase update call.
    pub fn build_update_payload(&self, order: &HostOrder) -> PurchaseUpdatePayload {
        PurchaseUpdatePayload { delivery_address: delivery_address(order) }
    }

    async fn build_order_line(
        &self,
        order: &HostOrder,
        item: &OrderItem,
        context: &mut BatchContext,
    ) -> Result<Option<OrderLinePayload>> {
        let store_id = order.store_id;
        let Some(product_id) = item.product_id else {
            debug!(item_id = item.item_id, "order line has no product, skipping");
            return Ok(None);
        };
        let Some(product) = self.product(store_id, product_id, context).await? else {
            debug!(item_id = item.item_id, product_id, "product no longer exists, skipping line");
            return Ok(None);
        };

        let mut attributes = self.product_attributes(store_id, &product, context).await?;
        if item.is_configurable() {
            for child in order.children_of(item.item_id) {
                let Some(child_id) = child.product_id else { continue };
                if let Some(child_product) = self.product(store_id, child_id, context).await? {
                    let child_attributes =
                        self.product_attributes(store_id, &child_product, context).await?;
                    attributes.merge_from(child_attributes);
                }
            }
        }

        let name = item.name.as_deref().or(product.name.as_deref()).unwrap_or_default();
        let sku = item.sku.as_deref().or(product.sku.as_deref()).unwrap_or_default();
        let url = product.url.as_deref().map(fields::canonical_product_url);

        let (price, price_currency) = match item.price {
            Some(price) => (
                Some(fields::minor_units(price)),
                Some(fields::string(order.currency_code.as_deref())),
            ),
            None => (None, None),
        };

        Ok(Some(OrderLinePayload {
            order_line_id: format!("{}{}", order.increment_id, item.item_id),
            product_name: fields::string(Some(&fields::truncate(name, MAX_NAME_LENGTH))),
            product_url: fields::string(url.as_deref()),
            is_not_returnable: fields::boolean(Some(product.is_returns_excluded())),
            quantity: fields::quantity(item.qty_ordered),
            sku: fields::string(Some(&fields::truncate(sku, MAX_SKU_LENGTH))),
            price,
            price_currency,
            categories: self.categories(store_id, &product, context).await?,
            attributes: (!attributes.is_empty()).then_some(attributes),
            image_url: self.image_url(store_id, &product, context).await?,
        }))
    }

    async fn product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        context: &mut BatchContext,
    ) -> Result<Option<Product>> {
        if let Some(cached) = context.products.get(&(store_id, product_id)) {
            return Ok(cached.clone());
        }
        let product = self.catalog.product(store_id, product_id).await?;
        context.products.insert((store_id, product_id), product.clone());
        Ok(product)
    }

    async fn store(&self, store_id: StoreId, context: &mut BatchContext) -> Result<Option<StoreInfo>> {
        if let Some(cached) = context.stores.get(&store_id) {
            return Ok(cached.clone());
        }
        let store = self.catalog.store(store_id).await?;
        context.stores.insert(store_id, store.clone());
        Ok(store)
    }

    /// Category names under the store's root category.
    async fn categories(
        &self,
        store_id: StoreId,
        product: &Product,
        context: &mut BatchContext,
    ) -> Result<Vec<String>> {
        let key = (store_id, product.id);
        if let Some(cached) = context.categories.get(&key) {
            return Ok(cached.clone());
        }

        let root = self.store(store_id, context).await?.and_then(|store| store.root_category_id);
        let names = match root {
            Some(root) if !product.category_ids.is_empty() => self
                .catalog
                .categories(&product.category_ids)
                .await?
                .into_iter()
                .filter(|category| category.is_under(root))
                .map(|category| category.name)
                .collect(),
            _ => Vec::new(),
        };

        context.categories.insert(key, names.clone());
        Ok(names)
    }

    async fn product_attributes(
        &self,
        store_id: StoreId,
        product: &Product,
        context: &mut BatchContext,
    ) -> Result<ProductAttributes> {
        let key = (store_id, product.id);
        if let Some(cached) = context.attributes.get(&key) {
            return Ok(cached.clone());
        }

        let color = match self.attribute_text(product, "color", context).await? {
            Some(color) => Some(color),
            None => self.attribute_text(product, "colour", context).await?,
        };

        let dimension_codes = ["length", "width", "height"];
        let dimensions = dimension_codes
            .iter()
            .any(|code| product.attribute(code).is_some())
            .then(|| Dimensions {
                length: fields::number(product.attribute("length")),
                width: fields::number(product.attribute("width")),
                height: fields::number(product.attribute("height")),
            });

        let attributes = ProductAttributes {
            size: self.attribute_text(product, "size", context).await?,
            weight: fields::optional_number(product.attribute("weight")),
            color,
            dimensions,
        };

        context.attributes.insert(key, attributes.clone());
        Ok(attributes)
    }

    /// Display text of an attribute, resolving option ids to labels.
    async fn attribute_text(
        &self,
        product: &Product,
        code: &str,
        context: &mut BatchContext,
    ) -> Result<Option<String>> {
        let Some(raw) = product.attribute(code) else {
            return Ok(None);
        };

        let definition = match context.attribute_definitions.get(code) {
            Some(cached) => cached.clone(),
            None => {
                let definition = self.catalog.attribute(code).await?;
                context.attribute_definitions.insert(code.to_string(), definition.clone());
                definition
            }
        };

        let text = match definition.as_ref().map(|d| d.frontend_input) {
            Some(FrontendInput::Select | FrontendInput::Multiselect) => {
                let definition = definition.as_ref();
                let labels: Vec<&str> = raw
                    .option_ids()
                    .iter()
                    .filter_map(|id| definition.and_then(|d| d.label_for(id)))
                    .collect();
                labels.join(", ")
            }
            Some(FrontendInput::Boolean) => {
                let label = if raw.is_truthy() { "Yes" } else { "No" };
                label.to_string()
            }
            _ => raw.as_text(),
        };

        Ok(fields::optional_text(Some(&text)))
    }

    async fn image_url(
        &self,
        store_id: StoreId,
        product: &Product,
        context: &mut BatchContext,
    ) -> Result<Option<String>> {
        let key = (store_id, product.id);
        if let Some(cached) = context.images.get(&key) {
            return Ok(cached.clone());
        }

        let path = product
            .image
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty() && *path != NO_SELECTION_IMAGE);

        let url = match path {
            Some(path) => self
                .store(store_id, context)
                .await?
                .and_then(|store| store.media_base_url)
                .map(|base| {
                    let normalised = path.replace('\\', "/");
                    format!(
                        "{}/catalog/product/{}",
                        base.trim_end_matches('/'),
                        normalised.trim_start_matches('/')
                    )
                }),
            None => None,
        };

        context.images.insert(key, url.clone());
        Ok(url)
    }
}

fn customer(order: &HostOrder) -> CustomerPayload {
    let first_name = fields::optional_text(order.customer_first_name.as_deref())
        .unwrap_or_else(|| GUEST_FIRST_NAME.to_string());
    let mobile_number = order
        .billing_address
        .as_ref()
        .and_then(|billing| fields::optional_text(billing.telephone.as_deref()));

    CustomerPayload {
        email: fields::string(order.customer_email.as_deref()),
        name: CustomerName {
            first_name: fields::string(Some(&first_name)),
            last_name: fields::optional_text(order.customer_last_name.as_deref()),
        },
        mobile_number,
    }
}

fn delivery_address(order: &HostOrder) -> DeliveryAddress {
    let mut address = DeliveryAddress::placeholder();
    let Some(shipping) = order.shipping_address.as_ref() else {
        return address;
    };

    address.town = fields::string(shipping.city.as_deref());
    address.postcode = fields::string(shipping.postcode.as_deref());
    address.country = fields::string(shipping.country_id.as_deref());
    address.area = fields::optional_text(shipping.region.as_deref());

    for (index, line) in shipping.street.iter().enumerate() {
        if !line.trim().is_empty() {
            address.lines.insert(format!("line{}", index + 1), line.clone());
        }
    }

    address
}
