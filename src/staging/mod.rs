use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::Result;

/// Scratch area for uploaded report files awaiting ingest.
///
/// Every staged file is owned by exactly one [`StagedUpload`] handle and is
/// gone by the end of the request that created it: commit moves it into the
/// brand archive, discard deletes it, and the handle's drop deletes it on
/// any unwound path. [`UploadStaging::sweep_stale`] is a secondary net for
/// files orphaned by a crash.
pub struct UploadStaging {
    base_path: PathBuf,
}

/// Handle to one staged upload. Removes its file on drop unless consumed.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    original_name: String,
    consumed: bool,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Marks the file as moved elsewhere; drop will no longer touch it.
    pub(crate) fn mark_consumed(&mut self) {
        self.consumed = true;
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if self.consumed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("failed to remove staged upload {}: {e}", self.path.display());
            }
        }
    }
}

impl UploadStaging {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("tmp_uploads"),
        }
    }

    /// Writes upload content to a uniquely named staging file.
    pub async fn stage(&self, data: &[u8], original_name: &str) -> Result<StagedUpload> {
        fs::create_dir_all(&self.base_path).await?;

        let safe_name = sanitize_file_name(original_name);
        let path = self
            .base_path
            .join(format!("{}-{safe_name}", Uuid::new_v4()));

        let mut file = File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        Ok(StagedUpload {
            path,
            original_name: safe_name,
            consumed: false,
        })
    }

    /// Removes a staged file without ingesting it.
    pub async fn discard(&self, mut staged: StagedUpload) -> Result<()> {
        staged.mark_consumed();
        match fs::remove_file(&staged.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes staged files older than `max_age`, returning how many were
    /// deleted. Backstop for files orphaned by a crash; scoped handles are
    /// the primary cleanup mechanism.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|m| m.elapsed().ok())
                .unwrap_or_default();
            if age >= max_age {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if removed > 0 {
            tracing::info!("swept {removed} stale staged uploads");
        }
        Ok(removed)
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
