//! Read-only catalog data needed to enrich purchase payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CategoryId, ProductId, StoreId};
use crate::constants::RETURNS_EXCLUDED_ATTRIBUTE;

/// Product as seen from one store view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Storefront URL, possibly carrying a store-view query string.
    #[serde(default)]
    pub url: Option<String>,
    /// Media path relative to `catalog/product/`.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    /// Raw attribute values keyed by attribute code.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Product {
    pub fn attribute(&self, code: &str) -> Option<&AttributeValue> {
        self.attributes.get(code)
    }

    /// Flag set on products that customers cannot return.
    pub fn is_returns_excluded(&self) -> bool {
        self.attribute(RETURNS_EXCLUDED_ATTRIBUTE).is_some_and(AttributeValue::is_truthy)
    }
}

/// Raw attribute value as stored by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// Value rendered as text; lists join with a comma.
    pub fn as_text(&self) -> String {
        match self {
            Self::Bool(value) => if *value { "1" } else { "0" }.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::List(values) => values.join(","),
        }
    }

    /// Host truthiness: `true`, non-zero numbers, and `"1"`/`"true"`/`"yes"`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0,
            Self::Text(value) => {
                matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
            }
            Self::List(values) => !values.is_empty(),
        }
    }

    /// Individual option ids of a select or multiselect value.
    pub fn option_ids(&self) -> Vec<String> {
        match self {
            Self::List(values) => values.iter().map(|v| v.trim().to_string()).collect(),
            other => other
                .as_text()
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Slash-separated ancestry ending with the category's own id, e.g. `1/2/14`.
    pub path: String,
}

impl Category {
    /// True when `root` is a strict ancestor of this category.
    pub fn is_under(&self, root: CategoryId) -> bool {
        let ids: Vec<&str> = self.path.split('/').collect();
        let root = root.to_string();
        ids.split_last().is_some_and(|(_, ancestors)| ancestors.iter().any(|id| *id == root))
    }
}

/// Storefront input type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontendInput {
    Text,
    Textarea,
    Select,
    Multiselect,
    Boolean,
    Price,
    Weight,
    Date,
    #[serde(other)]
    Other,
}

/// Attribute metadata used to turn raw values into display labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub code: String,
    pub frontend_input: FrontendInput,
    /// Option id to label.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl AttributeDefinition {
    pub fn label_for(&self, option_id: &str) -> Option<&str> {
        self.options.get(option_id).map(String::as_str)
    }
}

/// Store view settings relevant to payload building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub id: StoreId,
    #[serde(default)]
    pub root_category_id: Option<CategoryId>,
    /// Base URL of the media directory, with trailing slash.
    #[serde(default)]
    pub media_base_url: Option<String>,
}
