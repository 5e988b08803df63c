//! Read-only aggregates over a tenant's orders. Rendering belongs to the
//! web layer; everything here returns plain data.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{Row, params};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::tenant::TenantDb;
use crate::types::ProductMeta;

// Revenue is item_price per line item; tax and shipping are ignored so the
// same number appears everywhere a total is shown.
const ORDER_REVENUE_EXPR: &str = "COALESCE(o.item_price, 0.0)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub units: i64,
    pub total_sales: f64,
}

impl Totals {
    fn add(&mut self, units: i64, sales: f64) {
        self.units += units;
        self.total_sales += sales;
    }
}

/// Per-channel breakout. Only the US and Canada marketplaces are bucketed;
/// other channels count toward overall totals only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelBuckets {
    pub us: Totals,
    pub canada: Totals,
}

impl ChannelBuckets {
    fn add(&mut self, channel: Option<&str>, units: i64, sales: f64) {
        match bucket_channel(channel) {
            Some(Channel::Us) => self.us.add(units, sales),
            Some(Channel::Canada) => self.canada.add(units, sales),
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Us,
    Canada,
}

fn bucket_channel(channel: Option<&str>) -> Option<Channel> {
    match channel.map(str::trim).map(str::to_lowercase).as_deref() {
        Some("amazon.com") => Some(Channel::Us),
        Some("amazon.ca") => Some(Channel::Canada),
        _ => None,
    }
}

fn resolve_channel_filter(channel: Option<&str>) -> Option<&'static str> {
    match channel.map(str::trim).map(str::to_lowercase).as_deref() {
        Some("us") => Some("amazon.com"),
        Some("canada") => Some("amazon.ca"),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub meta: ProductMeta,
    pub totals: Totals,
    pub channels: ChannelBuckets,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    /// `YYYY-MM` for monthly summaries, `YYYY-Wnn` for weekly ones.
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub totals: Totals,
    pub channel_totals: ChannelBuckets,
    pub by_asin: BTreeMap<String, ProductSummary>,
}

struct SummaryRow {
    period: String,
    start_date: Option<String>,
    end_date: Option<String>,
    asin: Option<String>,
    quantity: i64,
    revenue: f64,
    sales_channel: Option<String>,
    meta: ProductMeta,
}

/// Total revenue between two dates inclusive, excluding cancelled line
/// items.
pub fn sales_total(db: &TenantDb, start_date: &str, end_date: &str) -> Result<f64> {
    let (start, end) = parse_date_range(start_date, end_date)?;

    let total = db.connection().query_row(
        &format!(
            "SELECT COALESCE(SUM({expr}), 0.0)
             FROM orders o
             WHERE o.purchase_date IS NOT NULL
               AND date(o.purchase_date) BETWEEN ?1 AND ?2
               AND LOWER(COALESCE(o.item_status, '')) NOT IN ('cancelled', 'canceled')
               AND o.item_price IS NOT NULL",
            expr = ORDER_REVENUE_EXPR
        ),
        params![start.to_string(), end.to_string()],
        |row| row.get(0),
    )?;
    Ok(total)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelSales {
    pub us: f64,
    pub canada: f64,
}

/// Like [`sales_total`] but bucketed by marketplace channel.
pub fn sales_total_by_channel(
    db: &TenantDb,
    start_date: &str,
    end_date: &str,
) -> Result<ChannelSales> {
    let (start, end) = parse_date_range(start_date, end_date)?;

    let conn = db.connection();
    let mut stmt = conn.prepare(&format!(
        "SELECT o.sales_channel, COALESCE(SUM({expr}), 0.0)
         FROM orders o
         WHERE o.purchase_date IS NOT NULL
           AND date(o.purchase_date) BETWEEN ?1 AND ?2
           AND o.item_price IS NOT NULL
         GROUP BY o.sales_channel",
        expr = ORDER_REVENUE_EXPR
    ))?;

    let rows = stmt.query_map(params![start.to_string(), end.to_string()], |row| {
        Ok((row.get::<_, Option<String>>(0)?, row.get::<_, f64>(1)?))
    })?;

    let mut totals = ChannelSales::default();
    for row in rows {
        let (channel, sales) = row?;
        match bucket_channel(channel.as_deref()) {
            Some(Channel::Us) => totals.us += sales,
            Some(Channel::Canada) => totals.canada += sales,
            None => {}
        }
    }
    Ok(totals)
}

/// Summaries for the past `n_months` calendar months, latest first.
pub fn monthly_summary(
    db: &TenantDb,
    n_months: u32,
    channel: Option<&str>,
) -> Result<Vec<PeriodSummary>> {
    if n_months < 1 {
        return Err(Error::BadRequest("n_months must be >= 1".into()));
    }

    // "Past N months" runs from the start of (N-1) months ago through now.
    let offset_expr = format!("{} months", -i64::from(n_months - 1));
    let channel_filter = resolve_channel_filter(channel);
    let channel_clause = if channel_filter.is_some() {
        "AND lower(COALESCE(o.sales_channel, '')) = ?2"
    } else {
        ""
    };

    let sql = format!(
        "SELECT
            strftime('%Y-%m', o.purchase_date) AS period,
            NULL, NULL,
            o.asin,
            COALESCE(o.quantity, 0),
            {expr},
            o.sales_channel,
            m.title_override, m.brand, m.category, m.subcategory,
            m.cost, m.launch_date, m.notes
         FROM orders o
         LEFT JOIN asin_meta m ON o.asin = m.asin
         WHERE o.purchase_date IS NOT NULL
           AND o.purchase_date >= date('now', 'start of month', ?1)
           AND o.item_price IS NOT NULL
           {channel_clause}",
        expr = ORDER_REVENUE_EXPR
    );

    let conn = db.connection();
    let mut stmt = conn.prepare(&sql)?;

    let rows = match channel_filter {
        Some(filter) => stmt.query_map(params![offset_expr, filter], summary_row)?,
        None => stmt.query_map(params![offset_expr], summary_row)?,
    };
    let rows = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    drop(stmt);
    drop(conn);

    let mut summaries = aggregate(rows);
    // Latest month first.
    summaries.reverse();
    Ok(summaries)
}

/// Summaries per ISO week between two dates inclusive, earliest first.
pub fn weekly_summary(
    db: &TenantDb,
    start_date: &str,
    end_date: &str,
    channel: Option<&str>,
) -> Result<Vec<PeriodSummary>> {
    let (start, end) = parse_date_range(start_date, end_date)?;

    let channel_filter = resolve_channel_filter(channel);
    let channel_clause = if channel_filter.is_some() {
        "AND lower(COALESCE(o.sales_channel, '')) = ?3"
    } else {
        ""
    };

    let sql = format!(
        "SELECT
            strftime('%Y-W%W', o.purchase_date) AS period,
            date(o.purchase_date, '-6 days', 'weekday 1') AS week_start,
            date(o.purchase_date, '-6 days', 'weekday 1', '+6 days') AS week_end,
            o.asin,
            COALESCE(o.quantity, 0),
            {expr},
            o.sales_channel,
            m.title_override, m.brand, m.category, m.subcategory,
            m.cost, m.launch_date, m.notes
         FROM orders o
         LEFT JOIN asin_meta m ON o.asin = m.asin
         WHERE o.purchase_date IS NOT NULL
           AND date(o.purchase_date) BETWEEN ?1 AND ?2
           AND o.item_price IS NOT NULL
           {channel_clause}",
        expr = ORDER_REVENUE_EXPR
    );

    let conn = db.connection();
    let mut stmt = conn.prepare(&sql)?;

    let rows = match channel_filter {
        Some(filter) => {
            stmt.query_map(params![start.to_string(), end.to_string(), filter], summary_row)?
        }
        None => stmt.query_map(params![start.to_string(), end.to_string()], summary_row)?,
    };
    let rows = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    drop(stmt);
    drop(conn);

    Ok(aggregate(rows))
}

/// Most recent `last_updated_date` (date portion) across all orders.
pub fn latest_update_date(db: &TenantDb) -> Result<Option<String>> {
    let latest = db.connection().query_row(
        "SELECT MAX(date(last_updated_date)) FROM orders WHERE last_updated_date IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(latest)
}

fn summary_row(row: &Row) -> rusqlite::Result<SummaryRow> {
    let asin: Option<String> = row.get(3)?;
    Ok(SummaryRow {
        period: row.get(0)?,
        start_date: row.get(1)?,
        end_date: row.get(2)?,
        quantity: row.get(4)?,
        revenue: row.get(5)?,
        sales_channel: row.get(6)?,
        meta: ProductMeta {
            asin: asin.clone().unwrap_or_default(),
            title_override: row.get(7)?,
            brand: row.get(8)?,
            category: row.get(9)?,
            subcategory: row.get(10)?,
            cost: row.get(11)?,
            launch_date: row.get(12)?,
            notes: row.get(13)?,
        },
        asin,
    })
}

fn aggregate(rows: Vec<SummaryRow>) -> Vec<PeriodSummary> {
    let mut periods: BTreeMap<String, PeriodSummary> = BTreeMap::new();

    for row in rows {
        let entry = periods
            .entry(row.period.clone())
            .or_insert_with(|| PeriodSummary {
                period: row.period.clone(),
                start_date: row.start_date.clone(),
                end_date: row.end_date.clone(),
                totals: Totals::default(),
                channel_totals: ChannelBuckets::default(),
                by_asin: BTreeMap::new(),
            });

        entry.totals.add(row.quantity, row.revenue);
        entry
            .channel_totals
            .add(row.sales_channel.as_deref(), row.quantity, row.revenue);

        let Some(asin) = row.asin else {
            continue;
        };
        let product = entry
            .by_asin
            .entry(asin)
            .or_insert_with(|| ProductSummary {
                meta: row.meta,
                totals: Totals::default(),
                channels: ChannelBuckets::default(),
            });
        product.totals.add(row.quantity, row.revenue);
        product
            .channels
            .add(row.sales_channel.as_deref(), row.quantity, row.revenue);
    }

    periods.into_values().collect()
}

fn parse_date_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| Error::BadRequest(format!("invalid date '{s}', expected YYYY-MM-DD")))
    };
    let start = parse(start)?;
    let end = parse(end)?;

    if start > end {
        return Err(Error::BadRequest(
            "start date must be on or before end date".into(),
        ));
    }
    Ok((start, end))
}
