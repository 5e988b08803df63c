use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account record. Credentials only; profile data belongs to the web
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
}

/// A registered brand (tenant). An entry exists in `brands.json` iff the
/// tenant database directory for `brand_id` exists on disk; the two are
/// created and retired together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandEntry {
    pub brand_id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    /// Open extension map for collaborators. Keys starting with `tallyman.`
    /// are reserved for this crate.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// One line item from a marketplace orders report. Column set mirrors the
/// flat-file report; dates are kept as the `YYYY-MM-DD HH:MM:SS` strings the
/// tenant schema stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderRecord {
    pub amazon_order_id: String,
    pub merchant_order_id: Option<String>,
    pub purchase_date: Option<String>,
    pub last_updated_date: String,
    pub order_status: Option<String>,
    pub fulfillment_channel: Option<String>,
    pub sales_channel: Option<String>,
    pub order_channel: Option<String>,
    pub url: Option<String>,
    pub ship_service_level: Option<String>,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub asin: Option<String>,
    pub item_status: Option<String>,
    pub quantity: Option<i64>,
    pub currency: Option<String>,
    pub item_price: Option<f64>,
    pub item_tax: Option<f64>,
    pub shipping_price: Option<f64>,
    pub shipping_tax: Option<f64>,
    pub gift_wrap_price: Option<f64>,
    pub gift_wrap_tax: Option<f64>,
    pub item_promotion_discount: Option<f64>,
    pub ship_promotion_discount: Option<f64>,
    pub ship_city: Option<String>,
    pub ship_state: Option<String>,
    pub ship_postal_code: Option<String>,
    pub ship_country: Option<String>,
    pub promotion_ids: Option<String>,
    pub is_business_order: Option<bool>,
    pub purchase_order_number: Option<String>,
    pub price_designation: Option<String>,
    pub buyer_identification_number: Option<String>,
    pub buyer_identification_type: Option<String>,
}

/// Editable metadata for one product (ASIN) within a tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMeta {
    pub asin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Audit row written after each successful report ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: i64,
    pub original_path: String,
    pub archived_path: String,
    pub imported_at: DateTime<Utc>,
    pub row_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_sha256: Option<String>,
}
