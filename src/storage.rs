use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest;
use crate::registry::BrandRegistry;
use crate::staging::{StagedUpload, UploadStaging};
use crate::store::{SqliteUserStore, UserStore};
use crate::tenant::{TenantDb, TenantManager};
use crate::types::{BrandEntry, ImportRecord, User};

/// Root handle over everything persisted under the data directory.
///
/// The web and auth layers reach persisted state exclusively through this
/// type; in particular, no collaborator opens a tenant database file by
/// path. One `Storage` lives for the life of the process.
pub struct Storage {
    config: Config,
    users: SqliteUserStore,
    registry: BrandRegistry,
    tenants: TenantManager,
    staging: UploadStaging,
}

impl Storage {
    /// Opens the stores under the configured data directory, creating the
    /// directory tree on first use.
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        fs::create_dir_all(config.brands_dir())?;
        fs::create_dir_all(config.upload_tmp_dir())?;

        let users = SqliteUserStore::new(config.user_db_path())?;
        users.initialize()?;

        Ok(Self {
            registry: BrandRegistry::new(config.brands_file()),
            tenants: TenantManager::new(config.clone()),
            staging: UploadStaging::new(&config.data_dir),
            users,
            config,
        })
    }

    /// Resolves the data directory from the environment and opens it. A
    /// resolution failure is fatal to startup.
    pub fn open_from_env() -> Result<Self> {
        Self::open(Config::from_env()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    // User operations

    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        self.users.create_user(username, password)
    }

    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<bool> {
        self.users.verify_credentials(username, password)
    }

    pub fn reset_password(&self, username: &str, new_password: &str) -> Result<()> {
        self.users.reset_password(username, new_password)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.users.list_users()
    }

    // Brand operations

    pub fn list_brands(&self) -> Result<Vec<BrandEntry>> {
        self.registry.list_brands()
    }

    pub fn get_brand(&self, brand_id: &str) -> Result<Option<BrandEntry>> {
        self.registry.get_brand(brand_id)
    }

    pub fn create_brand(
        &self,
        display_name: &str,
        requested_id: Option<&str>,
    ) -> Result<BrandEntry> {
        self.registry
            .create_brand(display_name, requested_id, &self.tenants)
    }

    pub fn delete_brand(&self, brand_id: &str) -> Result<()> {
        self.registry.delete_brand(brand_id, &self.tenants)
    }

    // Tenant database access

    pub fn get_database(&self, brand_id: &str) -> Result<Arc<TenantDb>> {
        self.tenants.get_database(&self.registry, brand_id)
    }

    // Upload staging

    pub async fn stage_upload(&self, data: &[u8], original_name: &str) -> Result<StagedUpload> {
        self.staging.stage(data, original_name).await
    }

    /// Ingests a staged report into the brand's database and archives the
    /// file. The staged file is gone afterwards whether this succeeds
    /// (archived) or fails (removed when the handle drops).
    pub async fn commit_upload(
        &self,
        mut staged: StagedUpload,
        brand_id: &str,
    ) -> Result<ImportRecord> {
        let brand = self
            .get_brand(brand_id)?
            .ok_or_else(|| Error::NoSuchBrand(brand_id.to_string()))?;
        let db = self.get_database(brand_id)?;

        let record = ingest::ingest_and_archive(
            &db,
            Some(&brand.display_name),
            staged.path(),
            staged.original_name(),
            &self.config.brand_archive_dir(brand_id),
        )?;
        staged.mark_consumed();
        Ok(record)
    }

    pub async fn discard_upload(&self, staged: StagedUpload) -> Result<()> {
        self.staging.discard(staged).await
    }

    /// Removes staged uploads older than `max_age`. Crash-recovery net;
    /// scoped handles already clean up request-lifetime files.
    pub async fn sweep_stale_uploads(&self, max_age: Duration) -> Result<usize> {
        self.staging.sweep_stale(max_age).await
    }
}
