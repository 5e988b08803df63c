use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{Error, Result};
use crate::types::OrderRecord;

/// Parses a tab-separated orders report.
///
/// The header row names the columns; unknown columns are ignored and empty
/// values become NULL. `amazon-order-id` and `last-updated-date` are
/// required per row.
pub fn parse_report(text: &str) -> Result<Vec<OrderRecord>> {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return Err(Error::BadReport("report is empty".into()));
    };

    let columns: HashMap<&str, usize> = header
        .split('\t')
        .map(str::trim)
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    for required in ["amazon-order-id", "last-updated-date"] {
        if !columns.contains_key(required) {
            return Err(Error::BadReport(format!("missing column '{required}'")));
        }
    }

    let mut records = Vec::new();

    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let get = |name: &str| -> Option<String> {
            columns
                .get(name)
                .and_then(|&i| fields.get(i))
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let row = line_no + 2;
        let Some(amazon_order_id) = get("amazon-order-id") else {
            return Err(Error::BadReport(format!("row {row} has no amazon-order-id")));
        };
        let last_updated_date = normalize_date(get("last-updated-date"))?
            .ok_or_else(|| Error::BadReport(format!("row {row} has no last-updated-date")))?;

        records.push(OrderRecord {
            amazon_order_id,
            merchant_order_id: get("merchant-order-id"),
            purchase_date: normalize_date(get("purchase-date"))?,
            last_updated_date,
            order_status: get("order-status"),
            fulfillment_channel: get("fulfillment-channel"),
            sales_channel: get("sales-channel"),
            order_channel: get("order-channel"),
            url: get("url"),
            ship_service_level: get("ship-service-level"),
            product_name: get("product-name"),
            sku: get("sku"),
            asin: get("asin"),
            item_status: get("item-status"),
            quantity: to_int(get("quantity")),
            currency: get("currency"),
            item_price: to_float(get("item-price")),
            item_tax: to_float(get("item-tax")),
            shipping_price: to_float(get("shipping-price")),
            shipping_tax: to_float(get("shipping-tax")),
            gift_wrap_price: to_float(get("gift-wrap-price")),
            gift_wrap_tax: to_float(get("gift-wrap-tax")),
            item_promotion_discount: to_float(get("item-promotion-discount")),
            ship_promotion_discount: to_float(get("ship-promotion-discount")),
            ship_city: get("ship-city"),
            ship_state: get("ship-state"),
            ship_postal_code: get("ship-postal-code"),
            ship_country: get("ship-country"),
            promotion_ids: get("promotion-ids"),
            is_business_order: get("is-business-order").map(|v| v == "true"),
            purchase_order_number: get("purchase-order-number"),
            price_designation: get("price-designation"),
            buyer_identification_number: get("buyer-identification-number"),
            buyer_identification_type: get("buyer-identification-type"),
        });
    }

    Ok(records)
}

/// Normalizes a report timestamp to the `YYYY-MM-DD HH:MM:SS` form the
/// tenant schema stores. Accepts RFC 3339, a bare datetime, or a bare date.
fn normalize_date(value: Option<String>) -> Result<Option<String>> {
    let Some(raw) = value else {
        return Ok(None);
    };

    let parsed = DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc).naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| Error::BadReport(format!("unparseable date '{raw}'")))?;

    Ok(Some(parsed.format("%Y-%m-%d %H:%M:%S").to_string()))
}

fn to_int(value: Option<String>) -> Option<i64> {
    value.and_then(|s| s.parse().ok())
}

fn to_float(value: Option<String>) -> Option<f64> {
    value.and_then(|s| s.parse().ok())
}
