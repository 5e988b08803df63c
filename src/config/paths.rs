use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable overriding the data directory root.
pub const DATA_DIR_ENV: &str = "TALLYMAN_DATA_DIR";

const APP_DIR_NAME: &str = "tallyman";

/// Returns the per-user data directory for this installation.
///
/// The `TALLYMAN_DATA_DIR` override wins when set and non-empty. Otherwise
/// the platform-local data directory is used (XDG data home or
/// `~/.local/share` on Linux, `~/Library/Application Support` on macOS,
/// `%LOCALAPPDATA%` on Windows) with the roaming data directory as fallback,
/// suffixed with the application name.
///
/// Pure with respect to the process environment: repeated calls in an
/// unchanged environment return the same path. Creating the directory is the
/// caller's responsibility.
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or_else(|| {
            Error::Config(format!(
                "cannot determine a data directory; set {DATA_DIR_ENV}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins() {
        temp_env::with_var(DATA_DIR_ENV, Some("/tmp/tallyman-test"), || {
            let dir = resolve_data_dir().unwrap();
            assert_eq!(dir, PathBuf::from("/tmp/tallyman-test"));
        });
    }

    #[test]
    fn test_empty_override_ignored() {
        temp_env::with_var(DATA_DIR_ENV, Some(""), || {
            let dir = resolve_data_dir().unwrap();
            assert!(dir.ends_with(APP_DIR_NAME));
        });
    }

    #[test]
    fn test_idempotent() {
        temp_env::with_var(DATA_DIR_ENV, None::<&str>, || {
            let first = resolve_data_dir().unwrap();
            let second = resolve_data_dir().unwrap();
            assert_eq!(first, second);
        });
    }
}
