mod schema;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::BrandRegistry;

/// One brand's isolated order database.
///
/// Writers serialize on the connection mutex; distinct tenants hold distinct
/// connections and never block each other. Isolation is physical: a handle
/// can only ever see the single file it was opened on.
pub struct TenantDb {
    brand_id: String,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for TenantDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantDb")
            .field("brand_id", &self.brand_id)
            .finish_non_exhaustive()
    }
}

impl TenantDb {
    fn open(brand_id: &str, db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(schema::SCHEMA)?;

        Ok(Self {
            brand_id: brand_id.to_string(),
            conn: Mutex::new(conn),
        })
    }

    pub fn brand_id(&self) -> &str {
        &self.brand_id
    }

    /// Returns a guard to the underlying database connection. Hold it only
    /// for the duration of one transaction; filesystem work does not belong
    /// under this lock.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owns the mapping from registered brand ids to open database handles.
///
/// Lifecycle per tenant: absent -> provisioned -> active -> archived.
/// Provisioning and archival run only from registry mutation paths; request
/// handlers reach tenant data exclusively through [`TenantManager::get_database`].
pub struct TenantManager {
    config: Config,
    open: Mutex<HashMap<String, Arc<TenantDb>>>,
}

impl TenantManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Opens the order database for a registered brand, creating the schema
    /// on first use. Fails with `NoSuchBrand` for unregistered ids so orphan
    /// paths are never reachable. Safe to call repeatedly and concurrently;
    /// all callers for one brand share the same handle.
    pub fn get_database(&self, registry: &BrandRegistry, brand_id: &str) -> Result<Arc<TenantDb>> {
        if !registry.contains(brand_id)? {
            return Err(Error::NoSuchBrand(brand_id.to_string()));
        }

        let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(db) = open.get(brand_id) {
            return Ok(db.clone());
        }

        let db_path = self.config.brand_db_path(brand_id);
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Arc::new(TenantDb::open(brand_id, &db_path)?);
        open.insert(brand_id.to_string(), db.clone());
        Ok(db)
    }

    /// Creates the tenant directory and lays down the schema. Invoked only
    /// from the registry's create path, before the entry is published.
    pub(crate) fn provision(&self, brand_id: &str) -> Result<()> {
        let dir = self.config.brand_dir(brand_id);
        fs::create_dir_all(&dir)?;
        TenantDb::open(brand_id, &self.config.brand_db_path(brand_id))?;

        tracing::info!("provisioned tenant database for '{brand_id}'");
        Ok(())
    }

    /// Rolls back a provision whose registry publish failed. The directory
    /// is moments old, so removal loses nothing.
    pub(crate) fn discard_provisioned(&self, brand_id: &str) -> Result<()> {
        self.evict(brand_id);
        match fs::remove_dir_all(self.config.brand_dir(brand_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Moves a retracted tenant's directory under `archive/`. Invoked only
    /// from the registry's delete path, after the entry is gone.
    pub(crate) fn archive(&self, brand_id: &str) -> Result<()> {
        self.evict(brand_id);

        let src = self.config.brand_dir(brand_id);
        if !src.exists() {
            return Ok(());
        }

        fs::create_dir_all(self.config.archive_dir())?;
        let ts = Utc::now().format("%Y%m%dT%H%M%SZ");
        let dest = self.config.archive_dir().join(format!("{brand_id}-{ts}"));
        fs::rename(&src, &dest)?;

        tracing::info!("archived tenant data for '{brand_id}' to {}", dest.display());
        Ok(())
    }

    fn evict(&self, brand_id: &str) {
        self.open
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(brand_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BrandRegistry, TenantManager) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let registry = BrandRegistry::new(config.brands_file());
        let tenants = TenantManager::new(config);
        (temp_dir, registry, tenants)
    }

    #[test]
    fn test_get_database_requires_registration() {
        let (_dir, registry, tenants) = setup();

        let err = tenants.get_database(&registry, "ghost").unwrap_err();
        assert!(matches!(err, Error::NoSuchBrand(_)));
    }

    #[test]
    fn test_get_database_after_create() {
        let (_dir, registry, tenants) = setup();

        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        let db = tenants.get_database(&registry, "acme").unwrap();
        assert_eq!(db.brand_id(), "acme");

        // Freshly provisioned database holds no orders.
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_handles_are_shared() {
        let (_dir, registry, tenants) = setup();

        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        let first = tenants.get_database(&registry, "acme").unwrap();
        let second = tenants.get_database(&registry, "acme").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_tenants_are_isolated() {
        let (_dir, registry, tenants) = setup();

        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        registry
            .create_brand("WidgetCo", Some("widgetco"), &tenants)
            .unwrap();

        let acme = tenants.get_database(&registry, "acme").unwrap();
        let widgetco = tenants.get_database(&registry, "widgetco").unwrap();

        acme.connection()
            .execute(
                "INSERT INTO orders (amazon_order_id, last_updated_date) VALUES ('A1', '2026-01-01 00:00:00')",
                [],
            )
            .unwrap();

        let acme_count: i64 = acme
            .connection()
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        let widgetco_count: i64 = widgetco
            .connection()
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();

        assert_eq!(acme_count, 1);
        assert_eq!(widgetco_count, 0);
    }

    #[test]
    fn test_deleted_brand_loses_access() {
        let (_dir, registry, tenants) = setup();

        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        tenants.get_database(&registry, "acme").unwrap();
        registry.delete_brand("acme", &tenants).unwrap();

        let err = tenants.get_database(&registry, "acme").unwrap_err();
        assert!(matches!(err, Error::NoSuchBrand(_)));
    }
}
