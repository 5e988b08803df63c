mod ids;

pub use ids::{slugify, validate_brand_id};

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::tenant::TenantManager;
use crate::types::BrandEntry;

/// The authoritative index of tenants, persisted as a JSON array in
/// `brands.json`.
///
/// The file is rewritten in full on every mutation via a temp-file-and-rename
/// in the same directory, so readers always observe either the old or the
/// new complete content. Writers serialize on a process-wide mutex; reads
/// take no lock.
///
/// Registry mutations are the only call sites for tenant provisioning: a
/// brand is provisioned before its entry is published, and its entry is
/// retracted before its data directory is archived. A crash between the two
/// steps leaves at worst an unreachable orphan directory, never a registry
/// entry without a backing database.
pub struct BrandRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl BrandRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Snapshot of all registered brands. Order carries no meaning; sort
    /// before display.
    pub fn list_brands(&self) -> Result<Vec<BrandEntry>> {
        self.load()
    }

    pub fn get_brand(&self, brand_id: &str) -> Result<Option<BrandEntry>> {
        Ok(self.load()?.into_iter().find(|b| b.brand_id == brand_id))
    }

    pub fn contains(&self, brand_id: &str) -> Result<bool> {
        Ok(self.load()?.iter().any(|b| b.brand_id == brand_id))
    }

    /// Registers a brand and provisions its tenant database.
    ///
    /// When `requested_id` is absent the id is derived from the display
    /// name. The tenant database is created first and the registry entry
    /// published last; if publishing fails the fresh database directory is
    /// discarded.
    pub fn create_brand(
        &self,
        display_name: &str,
        requested_id: Option<&str>,
        tenants: &TenantManager,
    ) -> Result<BrandEntry> {
        let brand_id = match requested_id {
            Some(id) => id.to_string(),
            None => slugify(display_name),
        };
        validate_brand_id(&brand_id)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        // Re-check under the lock so concurrent creates cannot both publish
        // the same id.
        let mut brands = self.load()?;
        if brands.iter().any(|b| b.brand_id == brand_id) {
            return Err(Error::DuplicateBrand(brand_id));
        }

        tenants.provision(&brand_id)?;

        let entry = BrandEntry {
            brand_id: brand_id.clone(),
            display_name: display_name.to_string(),
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        };
        brands.push(entry.clone());

        if let Err(e) = self.write_atomic(&brands) {
            if let Err(cleanup) = tenants.discard_provisioned(&brand_id) {
                tracing::warn!("failed to discard tenant database for '{brand_id}': {cleanup}");
            }
            return Err(e);
        }

        tracing::info!("registered brand '{brand_id}'");
        Ok(entry)
    }

    /// Retracts a brand from the registry, then archives its tenant
    /// directory.
    ///
    /// The entry is removed first; once the registry write lands the brand
    /// is unreachable through any lookup even if the process dies before
    /// the directory rename.
    pub fn delete_brand(&self, brand_id: &str, tenants: &TenantManager) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut brands = self.load()?;
        let before = brands.len();
        brands.retain(|b| b.brand_id != brand_id);
        if brands.len() == before {
            return Err(Error::NoSuchBrand(brand_id.to_string()));
        }

        self.write_atomic(&brands)?;
        tenants.archive(brand_id)?;

        tracing::info!("deleted brand '{brand_id}'");
        Ok(())
    }

    fn load(&self) -> Result<Vec<BrandEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(Error::Registry)
    }

    fn write_atomic(&self, brands: &[BrandEntry]) -> Result<()> {
        let json = serde_json::to_vec_pretty(brands).map_err(Error::Registry)?;

        let tmp_path = self
            .path
            .with_file_name(format!("brands.json.{}.tmp", Uuid::new_v4()));

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(&json)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn test_registry() -> (TempDir, BrandRegistry, TenantManager) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let registry = BrandRegistry::new(config.brands_file());
        let tenants = TenantManager::new(config);
        (temp_dir, registry, tenants)
    }

    #[test]
    fn test_empty_registry_lists_nothing() {
        let (_dir, registry, _tenants) = test_registry();
        assert!(registry.list_brands().unwrap().is_empty());
    }

    #[test]
    fn test_create_list_delete_round_trip() {
        let (_dir, registry, tenants) = test_registry();

        let entry = registry
            .create_brand("Acme Co", Some("acme"), &tenants)
            .unwrap();
        assert_eq!(entry.brand_id, "acme");
        assert_eq!(entry.display_name, "Acme Co");

        let brands = registry.list_brands().unwrap();
        assert_eq!(brands.len(), 1);
        assert_eq!(brands[0].brand_id, "acme");

        registry.delete_brand("acme", &tenants).unwrap();
        assert!(registry.list_brands().unwrap().is_empty());
    }

    #[test]
    fn test_generated_id_from_display_name() {
        let (_dir, registry, tenants) = test_registry();

        let entry = registry.create_brand("Acme & Sons", None, &tenants).unwrap();
        assert_eq!(entry.brand_id, "acme-sons");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (_dir, registry, tenants) = test_registry();

        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        let err = registry
            .create_brand("Other", Some("acme"), &tenants)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateBrand(_)));
    }

    #[test]
    fn test_invalid_id_rejected() {
        let (_dir, registry, tenants) = test_registry();

        let err = registry
            .create_brand("Evil", Some("../evil"), &tenants)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBrandId(_)));
        assert!(registry.list_brands().unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_brand() {
        let (_dir, registry, tenants) = test_registry();

        let err = registry.delete_brand("ghost", &tenants).unwrap_err();
        assert!(matches!(err, Error::NoSuchBrand(_)));
    }

    #[test]
    fn test_create_provisions_database_file() {
        let (dir, registry, tenants) = test_registry();

        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        assert!(dir.path().join("brands/acme/orders.sqlite").exists());
    }

    #[test]
    fn test_delete_archives_tenant_directory() {
        let (dir, registry, tenants) = test_registry();

        registry.create_brand("Acme", Some("acme"), &tenants).unwrap();
        registry.delete_brand("acme", &tenants).unwrap();

        assert!(!dir.path().join("brands/acme").exists());
        let archived: Vec<_> = fs::read_dir(dir.path().join("archive"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].starts_with("acme-"));
    }

    #[test]
    fn test_corrupt_registry_surfaces_error() {
        let (dir, registry, _tenants) = test_registry();

        fs::write(dir.path().join("brands.json"), b"{not json").unwrap();
        assert!(matches!(
            registry.list_brands(),
            Err(Error::Registry(_))
        ));
    }

    #[test]
    fn test_concurrent_creates_distinct_ids() {
        let (_dir, registry, tenants) = test_registry();
        let registry = std::sync::Arc::new(registry);
        let tenants = std::sync::Arc::new(tenants);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                let tenants = tenants.clone();
                std::thread::spawn(move || {
                    registry.create_brand(&format!("Brand {i}"), None, &tenants)
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(registry.list_brands().unwrap().len(), 8);
    }

    #[test]
    fn test_concurrent_creates_same_id_one_winner() {
        let (_dir, registry, tenants) = test_registry();
        let registry = std::sync::Arc::new(registry);
        let tenants = std::sync::Arc::new(tenants);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                let tenants = tenants.clone();
                std::thread::spawn(move || registry.create_brand("Acme", Some("acme"), &tenants))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(Error::DuplicateBrand(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 3);
    }
}
