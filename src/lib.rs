//! # Tallyman
//!
//! Storage core for a self-hostable, multi-brand order-reporting
//! application, usable both behind the bundled CLI and as a library.
//!
//! Each brand is an isolated tenant: a JSON registry (`brands.json`) is the
//! authoritative list of brands, and every registered brand owns a physically
//! separate SQLite database under `brands/<brand_id>/orders.sqlite`. User
//! credentials live in their own database, and uploaded report files pass
//! through a scratch directory before being ingested and archived.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! tallyman = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use tallyman::config::Config;
//! use tallyman::storage::Storage;
//!
//! let storage = Storage::open(Config::from_env()?)?;
//! storage.create_brand("Acme Co", None)?;
//! let db = storage.get_database("acme-co")?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI binary's dependencies. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod reports;
pub mod staging;
pub mod storage;
pub mod store;
pub mod tenant;
pub mod types;
