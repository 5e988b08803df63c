mod report;

pub use report::parse_report;

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use rusqlite::params;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::tenant::TenantDb;
use crate::types::{ImportRecord, OrderRecord};

/// Ingests a staged orders report into a tenant database and archives the
/// source file.
///
/// Rows replace any existing orders with the same order ids inside one
/// transaction, product metadata is seeded for newly seen ASINs, and the
/// file lands under the brand's archive directory with a timestamp prefix
/// and its SHA-256 recorded in the `imports` audit table. The staged file is
/// consumed (moved) on success.
pub fn ingest_and_archive(
    db: &TenantDb,
    brand_display_name: Option<&str>,
    report_path: &Path,
    original_name: &str,
    archive_dir: &Path,
) -> Result<ImportRecord> {
    let text = read_report(report_path)?;
    let records = parse_report(&text)?;

    let row_count = apply_report(db, &records)?;
    let seeded = seed_product_meta(db, brand_display_name)?;

    fs::create_dir_all(archive_dir)?;
    let ts = Utc::now().format("%Y%m%dT%H%M%SZ");
    let archived_path = archive_dir.join(format!("{ts}__{original_name}"));
    fs::rename(report_path, &archived_path)?;

    let file_sha256 = hex::encode(Sha256::digest(fs::read(&archived_path)?));
    let imported_at = Utc::now();

    let conn = db.connection();
    conn.execute(
        "INSERT INTO imports (original_path, archived_path, imported_at, row_count, file_sha256)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            report_path.display().to_string(),
            archived_path.display().to_string(),
            imported_at.to_rfc3339(),
            row_count as i64,
            file_sha256,
        ],
    )?;
    let id = conn.last_insert_rowid();
    drop(conn);

    tracing::info!(
        "ingested {row_count} rows into '{}', seeded {seeded} products, archived {}",
        db.brand_id(),
        archived_path.display()
    );

    Ok(ImportRecord {
        id,
        original_path: report_path.display().to_string(),
        archived_path: archived_path.display().to_string(),
        imported_at,
        row_count: row_count as i64,
        file_sha256: Some(file_sha256),
    })
}

fn read_report(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            Err(Error::BadReport("report is not valid UTF-8".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes existing orders with the report's order ids and inserts the fresh
/// rows, all in one transaction. Returns the inserted row count.
fn apply_report(db: &TenantDb, records: &[OrderRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let order_ids: BTreeSet<&str> = records.iter().map(|r| r.amazon_order_id.as_str()).collect();

    let mut conn = db.connection();
    let tx = conn.transaction()?;

    let placeholders = vec!["?"; order_ids.len()].join(",");
    tx.execute(
        &format!("DELETE FROM orders WHERE amazon_order_id IN ({placeholders})"),
        rusqlite::params_from_iter(order_ids.iter().copied()),
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO orders (
                amazon_order_id, merchant_order_id, purchase_date, last_updated_date,
                order_status, fulfillment_channel, sales_channel, order_channel,
                url, ship_service_level, product_name, sku, asin, item_status,
                quantity, currency, item_price, item_tax, shipping_price,
                shipping_tax, gift_wrap_price, gift_wrap_tax,
                item_promotion_discount, ship_promotion_discount, ship_city,
                ship_state, ship_postal_code, ship_country, promotion_ids,
                is_business_order, purchase_order_number, price_designation,
                buyer_identification_number, buyer_identification_type
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26,
                ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34
            )",
        )?;

        for r in records {
            stmt.execute(params![
                r.amazon_order_id,
                r.merchant_order_id,
                r.purchase_date,
                r.last_updated_date,
                r.order_status,
                r.fulfillment_channel,
                r.sales_channel,
                r.order_channel,
                r.url,
                r.ship_service_level,
                r.product_name,
                r.sku,
                r.asin,
                r.item_status,
                r.quantity,
                r.currency,
                r.item_price,
                r.item_tax,
                r.shipping_price,
                r.shipping_tax,
                r.gift_wrap_price,
                r.gift_wrap_tax,
                r.item_promotion_discount,
                r.ship_promotion_discount,
                r.ship_city,
                r.ship_state,
                r.ship_postal_code,
                r.ship_country,
                r.promotion_ids,
                r.is_business_order,
                r.purchase_order_number,
                r.price_designation,
                r.buyer_identification_number,
                r.buyer_identification_type,
            ])?;
        }
    }

    tx.commit()?;
    Ok(records.len())
}

/// Seeds `asin_meta` rows for ASINs present in orders but absent from the
/// catalog, using the first comma segment of the product name with any
/// leading brand-name prefix stripped. Returns the number of rows seeded.
pub fn seed_product_meta(db: &TenantDb, brand_display_name: Option<&str>) -> Result<usize> {
    let conn = db.connection();

    let mut stmt = conn.prepare(
        "SELECT o.asin, MIN(o.product_name) AS product_name
         FROM orders o
         LEFT JOIN asin_meta m ON o.asin = m.asin
         WHERE o.asin IS NOT NULL
           AND TRIM(o.asin) <> ''
           AND m.asin IS NULL
           AND o.product_name IS NOT NULL
           AND TRIM(o.product_name) <> ''
           AND TRIM(o.product_name) <> '-'
         GROUP BY o.asin",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let unseen = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    drop(stmt);

    let mut seeded = 0;
    for (asin, product_name) in unseen {
        let Some(title) = extract_title(&product_name, brand_display_name) else {
            continue;
        };
        seeded += conn.execute(
            "INSERT OR IGNORE INTO asin_meta (asin, title_override) VALUES (?1, ?2)",
            params![asin, title],
        )?;
    }

    Ok(seeded)
}

/// First comma segment of the product name, minus a leading brand-name
/// prefix. `None` when nothing usable remains.
fn extract_title(product_name: &str, brand_display_name: Option<&str>) -> Option<String> {
    let name = product_name
        .split(',')
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "-")?;

    let stripped = match brand_display_name.map(str::trim).filter(|b| !b.is_empty()) {
        Some(brand)
            if name.len() >= brand.len()
                && name
                    .get(..brand.len())
                    .is_some_and(|p| p.eq_ignore_ascii_case(brand)) =>
        {
            name.get(brand.len()..)?
                .trim_start_matches([' ', ',', ':', '-'])
        }
        _ => name,
    };

    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::BrandRegistry;
    use crate::tenant::TenantManager;
    use std::sync::Arc;
    use tempfile::TempDir;

    const HEADER: &str = "amazon-order-id\tlast-updated-date\tpurchase-date\tproduct-name\tasin\tquantity\titem-price\tsales-channel\titem-status";

    fn setup() -> (TempDir, Config, Arc<TenantDb>) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let registry = BrandRegistry::new(config.brands_file());
        let tenants = TenantManager::new(config.clone());
        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        let db = tenants.get_database(&registry, "acme").unwrap();
        (temp_dir, config, db)
    }

    fn write_report(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn order_count(db: &TenantDb) -> i64 {
        db.connection()
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_ingest_inserts_and_archives() {
        let (dir, config, db) = setup();
        let body = format!(
            "{HEADER}\n111-1\t2026-01-05T10:00:00+00:00\t2026-01-04T09:30:00+00:00\tAcme Widget, Blue\tB01\t2\t19.99\tAmazon.com\tShipped\n"
        );
        let report = write_report(dir.path(), "orders.txt", &body);

        let import = ingest_and_archive(
            &db,
            Some("Acme"),
            &report,
            "orders.txt",
            &config.brand_archive_dir("acme"),
        )
        .unwrap();

        assert_eq!(import.row_count, 1);
        assert_eq!(order_count(&db), 1);
        assert!(!report.exists());
        assert!(Path::new(&import.archived_path).exists());
        assert_eq!(import.file_sha256.as_ref().unwrap().len(), 64);

        let imports: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM imports", [], |row| row.get(0))
            .unwrap();
        assert_eq!(imports, 1);
    }

    #[test]
    fn test_reingest_replaces_rows() {
        let (dir, config, db) = setup();
        let archive = config.brand_archive_dir("acme");

        let body = format!("{HEADER}\n111-1\t2026-01-05\t2026-01-04\tWidget\tB01\t2\t19.99\tAmazon.com\tShipped\n");
        let first = write_report(dir.path(), "a.txt", &body);
        ingest_and_archive(&db, Some("Acme"), &first, "a.txt", &archive).unwrap();

        // Same order id, updated status; must replace rather than duplicate.
        let body = format!("{HEADER}\n111-1\t2026-01-06\t2026-01-04\tWidget\tB01\t2\t19.99\tAmazon.com\tCancelled\n");
        let second = write_report(dir.path(), "b.txt", &body);
        ingest_and_archive(&db, Some("Acme"), &second, "b.txt", &archive).unwrap();

        assert_eq!(order_count(&db), 1);
        let status: String = db
            .connection()
            .query_row(
                "SELECT item_status FROM orders WHERE amazon_order_id = '111-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(status, "Cancelled");
    }

    #[test]
    fn test_empty_report_archives_zero_rows() {
        let (dir, config, db) = setup();
        let report = write_report(dir.path(), "empty.txt", &format!("{HEADER}\n"));

        let import = ingest_and_archive(
            &db,
            Some("Acme"),
            &report,
            "empty.txt",
            &config.brand_archive_dir("acme"),
        )
        .unwrap();

        assert_eq!(import.row_count, 0);
        assert!(!report.exists());
    }

    #[test]
    fn test_malformed_report_leaves_db_untouched() {
        let (dir, config, db) = setup();
        let report = write_report(dir.path(), "bad.txt", "no\tuseful\tcolumns\n1\t2\t3\n");

        let err = ingest_and_archive(
            &db,
            Some("Acme"),
            &report,
            "bad.txt",
            &config.brand_archive_dir("acme"),
        )
        .unwrap_err();

        assert!(matches!(err, Error::BadReport(_)));
        assert_eq!(order_count(&db), 0);
        // Staged file remains for the caller to discard.
        assert!(report.exists());
    }

    #[test]
    fn test_seeding_strips_brand_prefix() {
        let (dir, config, db) = setup();
        let body = format!(
            "{HEADER}\n111-1\t2026-01-05\t2026-01-04\tAcme Widget, Blue, 2-pack\tB01\t1\t9.99\tAmazon.com\tShipped\n"
        );
        let report = write_report(dir.path(), "orders.txt", &body);
        ingest_and_archive(&db, Some("Acme"), &report, "orders.txt", &config.brand_archive_dir("acme")).unwrap();

        let title: String = db
            .connection()
            .query_row(
                "SELECT title_override FROM asin_meta WHERE asin = 'B01'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(title, "Widget");
    }

    #[test]
    fn test_seeding_preserves_existing_meta() {
        let (dir, config, db) = setup();
        db.connection()
            .execute(
                "INSERT INTO asin_meta (asin, title_override) VALUES ('B01', 'Curated Name')",
                [],
            )
            .unwrap();

        let body = format!("{HEADER}\n111-1\t2026-01-05\t2026-01-04\tAcme Widget\tB01\t1\t9.99\tAmazon.com\tShipped\n");
        let report = write_report(dir.path(), "orders.txt", &body);
        ingest_and_archive(&db, Some("Acme"), &report, "orders.txt", &config.brand_archive_dir("acme")).unwrap();

        let title: String = db
            .connection()
            .query_row(
                "SELECT title_override FROM asin_meta WHERE asin = 'B01'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(title, "Curated Name");
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("Acme Widget, Blue", Some("Acme")),
            Some("Widget".to_string())
        );
        assert_eq!(
            extract_title("Widget, Blue", None),
            Some("Widget".to_string())
        );
        assert_eq!(extract_title("-", Some("Acme")), None);
        assert_eq!(extract_title("Acme", Some("Acme")), None);
        assert_eq!(
            extract_title("acme widget", Some("Acme")),
            Some("widget".to_string())
        );
    }
}
