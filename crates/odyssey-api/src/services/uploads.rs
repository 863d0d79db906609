//! Upload file storage.
//!
//! Files are written flat into the configured directory as
//! `<unix-millis><ext>`. Names are claimed with `create_new`, so two uploads
//! landing in the same millisecond get consecutive timestamps instead of
//! overwriting each other.

use crate::errors::ApiError;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Longest kept file extension, excluding the dot.
const MAX_EXTENSION_LENGTH: usize = 10;

/// Name attempts before giving up on a crowded millisecond.
const MAX_NAME_ATTEMPTS: i64 = 16;

/// Writes uploaded files to disk.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
}

impl UploadStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory files are written to and served from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh timestamp name and return the file name.
    ///
    /// The extension is taken from `original_name` when it is short and
    /// alphanumeric, otherwise the file is stored without one.
    #[instrument(skip_all, name = "odyssey.uploads.store", fields(size = bytes.len()))]
    pub async fn store(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            ApiError::Internal(format!("Failed to create upload directory: {}", e))
        })?;

        let extension = original_name.map(sanitize_extension).unwrap_or_default();
        let base = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = format!("{}{}", base + attempt, extension);
            let path = self.dir.join(&file_name);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(ApiError::Internal(format!(
                        "Failed to create upload file: {}",
                        e
                    )))
                }
            };

            file.write_all(bytes)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to write upload: {}", e)))?;
            file.flush()
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to flush upload: {}", e)))?;

            tracing::info!(target: "odyssey.uploads", file = %file_name, "Stored upload");
            return Ok(file_name);
        }

        Err(ApiError::Internal(
            "Failed to allocate a unique upload file name".to_string(),
        ))
    }
}

/// `.ext` in lowercase, or empty if the name has no usable extension.
fn sanitize_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension("andromeda.PNG"), ".png");
        assert_eq!(sanitize_extension("archive.tar.gz"), ".gz");
        assert_eq!(sanitize_extension("no_extension"), "");
        assert_eq!(sanitize_extension("weird.p$g"), "");
        assert_eq!(sanitize_extension("long.abcdefghijk"), "");
        assert_eq!(sanitize_extension("../../etc/passwd"), "");
    }

    #[tokio::test]
    async fn test_store_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = UploadStorage::new(dir.path());

        let name = storage.store(Some("orion.jpg"), b"nebula").await.unwrap();

        assert!(name.ends_with(".jpg"));
        let stem = name.trim_end_matches(".jpg");
        assert!(stem.parse::<i64>().is_ok());
        let written = std::fs::read(dir.path().join(&name)).unwrap();
        assert_eq!(written, b"nebula");
    }

    #[tokio::test]
    async fn test_concurrent_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let storage = UploadStorage::new(dir.path());

        let first = storage.store(None, b"one").await.unwrap();
        let second = storage.store(None, b"two").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(dir.path().join(&first)).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join(&second)).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_store_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = UploadStorage::new(dir.path().join("nested").join("uploads"));

        let name = storage.store(Some("x.txt"), b"x").await.unwrap();

        assert!(storage.dir().join(name).exists());
    }
}
