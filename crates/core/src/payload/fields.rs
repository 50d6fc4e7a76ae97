//! Field normalisation for the returns API.
//!
//! The API rejects empty strings on required fields, so blank strings become
//! a single space, missing numbers become 0 and missing flags become false.

use returnsync_domain::constants::{BLANK_FIELD, PRICE_PRECISION, STORE_VIEW_QUERY_MARKER};
use returnsync_domain::AttributeValue;

/// Required string field.
pub fn string(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => BLANK_FIELD.to_string(),
    }
}

/// Numeric field; non-numeric input becomes 0.
pub fn number(value: Option<&AttributeValue>) -> f64 {
    match value {
        Some(AttributeValue::Number(n)) if n.is_finite() => *n,
        Some(AttributeValue::Text(text)) => {
            text.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Numeric field that is left out when missing, blank or zero.
pub fn optional_number(value: Option<&AttributeValue>) -> Option<f64> {
    value.map(|raw| number(Some(raw))).filter(|n| *n != 0.0)
}

pub fn boolean(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

/// Optional string field, dropped when blank.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|text| !text.is_empty()).map(ToString::to_string)
}

/// First `max_chars` characters of `value`.
pub fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Product URL without the host's store-view query string.
pub fn canonical_product_url(url: &str) -> String {
    match url.find(STORE_VIEW_QUERY_MARKER) {
        Some(index) => url[..index].to_string(),
        None => url.to_string(),
    }
}

/// Quantity the API accepts: fractional quantities count as one unit.
#[allow(clippy::cast_possible_truncation)]
pub fn quantity(qty_ordered: f64) -> i64 {
    if !qty_ordered.is_finite() || qty_ordered.fract() != 0.0 {
        1
    } else {
        qty_ordered as i64
    }
}

/// Price in minor units: formatted to the currency precision, digits only.
pub fn minor_units(price: f64) -> i64 {
    let precision = usize::try_from(PRICE_PRECISION).unwrap_or(2);
    let formatted = format!("{price:.precision$}");
    let digits: String = formatted.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
