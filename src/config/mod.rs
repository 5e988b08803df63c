mod paths;

pub use paths::{DATA_DIR_ENV, resolve_data_dir};

use std::path::PathBuf;

use crate::error::Result;

/// Process-wide storage configuration. The data directory is resolved once at
/// startup; every persisted entity is addressed relative to it.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolves the data directory from the environment (see
    /// [`resolve_data_dir`]). Fails with `Error::Config` when no usable
    /// location exists; callers treat that as fatal to startup.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            data_dir: resolve_data_dir()?,
        })
    }

    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn user_db_path(&self) -> PathBuf {
        self.data_dir.join("users.sqlite")
    }

    #[must_use]
    pub fn brands_file(&self) -> PathBuf {
        self.data_dir.join("brands.json")
    }

    #[must_use]
    pub fn brands_dir(&self) -> PathBuf {
        self.data_dir.join("brands")
    }

    #[must_use]
    pub fn brand_dir(&self, brand_id: &str) -> PathBuf {
        self.brands_dir().join(brand_id)
    }

    #[must_use]
    pub fn brand_db_path(&self, brand_id: &str) -> PathBuf {
        self.brand_dir(brand_id).join("orders.sqlite")
    }

    #[must_use]
    pub fn brand_archive_dir(&self, brand_id: &str) -> PathBuf {
        self.brand_dir(brand_id).join("archive")
    }

    #[must_use]
    pub fn upload_tmp_dir(&self) -> PathBuf {
        self.data_dir.join("tmp_uploads")
    }

    /// Destination for archived tenant directories after brand deletion.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("archive")
    }
}
