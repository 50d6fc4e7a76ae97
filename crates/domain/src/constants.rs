//! Application constants
//!
//! Limits and identifiers imposed by the returns API.

/// Longest product name the returns API accepts.
pub const MAX_NAME_LENGTH: usize = 60;
/// Longest SKU the returns API accepts.
pub const MAX_SKU_LENGTH: usize = 255;

/// Purchase resource path, trailing slash included.
pub const PURCHASES_PATH: &str = "/v1/purchases/";
/// OAuth scope required for purchase writes.
pub const PURCHASES_SCOPE: &str = "purchases:write";
/// OAuth token endpoint path.
pub const TOKEN_PATH: &str = "/v1/oauth/token";

/// Placeholder for required string fields that would otherwise be empty.
pub const BLANK_FIELD: &str = " ";
/// Country placeholder; the API requires two characters.
pub const BLANK_COUNTRY: &str = "  ";
/// First name used when the order has none.
pub const GUEST_FIRST_NAME: &str = "Guest";

/// Product attribute flagging an item as not returnable.
pub const RETURNS_EXCLUDED_ATTRIBUTE: &str = "returns_excluded";
/// Image path value meaning "no image".
pub const NO_SELECTION_IMAGE: &str = "no_selection";
/// Query parameter the host appends to product URLs for store views.
pub const STORE_VIEW_QUERY_MARKER: &str = "?___store";
/// Decimal places used to turn prices into minor units.
pub const PRICE_PRECISION: i32 = 2;

/// Dedicated log file prefix.
pub const LOG_FILE_PREFIX: &str = "returns-sync.log";
