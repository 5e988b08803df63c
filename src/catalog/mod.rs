use rusqlite::{OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::tenant::TenantDb;
use crate::types::ProductMeta;

const ROW_SQL: &str = "SELECT asin, title_override, brand, category, subcategory, cost, launch_date, notes
     FROM asin_meta";

fn row_to_meta(row: &Row) -> rusqlite::Result<ProductMeta> {
    Ok(ProductMeta {
        asin: row.get(0)?,
        title_override: row.get(1)?,
        brand: row.get(2)?,
        category: row.get(3)?,
        subcategory: row.get(4)?,
        cost: row.get(5)?,
        launch_date: row.get(6)?,
        notes: row.get(7)?,
    })
}

pub fn list_product_meta(db: &TenantDb) -> Result<Vec<ProductMeta>> {
    let conn = db.connection();
    let mut stmt = conn.prepare(&format!("{ROW_SQL} ORDER BY asin"))?;

    let rows = stmt.query_map([], row_to_meta)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub fn get_product_meta(db: &TenantDb, asin: &str) -> Result<Option<ProductMeta>> {
    let conn = db.connection();
    conn.query_row(&format!("{ROW_SQL} WHERE asin = ?1"), params![asin], row_to_meta)
        .optional()
        .map_err(Error::from)
}

pub fn upsert_product_meta(db: &TenantDb, meta: &ProductMeta) -> Result<()> {
    db.connection().execute(
        "INSERT INTO asin_meta (
            asin, title_override, brand, category, subcategory, cost, launch_date, notes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(asin) DO UPDATE SET
            title_override = excluded.title_override,
            brand          = excluded.brand,
            category       = excluded.category,
            subcategory    = excluded.subcategory,
            cost           = excluded.cost,
            launch_date    = excluded.launch_date,
            notes          = excluded.notes",
        params![
            meta.asin,
            meta.title_override,
            meta.brand,
            meta.category,
            meta.subcategory,
            meta.cost,
            meta.launch_date,
            meta.notes,
        ],
    )?;
    Ok(())
}

pub fn delete_product_meta(db: &TenantDb, asin: &str) -> Result<bool> {
    let rows = db
        .connection()
        .execute("DELETE FROM asin_meta WHERE asin = ?1", params![asin])?;
    Ok(rows > 0)
}
