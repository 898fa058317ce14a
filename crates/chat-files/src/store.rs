//! Temporary blob store backing uploaded files.
//!
//! Every blob is exclusively owned by the request that created it and must be
//! deleted on every code path, success or failure. Deletion is best-effort:
//! failures are logged and never escalated, and deleting the same handle
//! twice is safe.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chat_core::GatewayError;
use tracing::{debug, warn};
use uuid::Uuid;

/// Opaque handle addressing one stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    path: PathBuf,
}

impl BlobHandle {
    /// File name of the backing blob, for logging.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<blob>")
    }
}

/// Filesystem-backed temporary blob store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open (creating if necessary) a blob store rooted at `dir`.
    ///
    /// # Errors
    /// [`GatewayError::Blob`] when the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let root = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| GatewayError::blob(format!("failed to create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    /// Persist raw bytes, returning a handle. The extension is preserved so
    /// operators can inspect stray blobs.
    ///
    /// # Errors
    /// [`GatewayError::Blob`] when the write fails.
    pub async fn put(&self, bytes: &[u8], extension: &str) -> Result<BlobHandle, GatewayError> {
        let path = self.root.join(format!("{}{extension}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| GatewayError::blob(format!("failed to write blob: {e}")))?;
        debug!(blob = %path.display(), size = bytes.len(), "Stored blob");
        Ok(BlobHandle { path })
    }

    /// Read a blob as text, replacing invalid UTF-8 sequences.
    ///
    /// Lossy on purpose: registered document formats (PDF, DOC) are binary,
    /// and their bytes are forwarded as-is for the completion service to make
    /// sense of. A supported upload must never fail here on encoding.
    ///
    /// # Errors
    /// [`GatewayError::Blob`] when the read fails.
    pub async fn read_text(&self, handle: &BlobHandle) -> Result<String, GatewayError> {
        let bytes = tokio::fs::read(&handle.path)
            .await
            .map_err(|e| {
                GatewayError::blob(format!("failed to read blob {}: {e}", handle.name()))
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a blob as base64-encoded bytes.
    ///
    /// # Errors
    /// [`GatewayError::Blob`] when the read fails.
    pub async fn read_base64(&self, handle: &BlobHandle) -> Result<String, GatewayError> {
        let bytes = tokio::fs::read(&handle.path)
            .await
            .map_err(|e| {
                GatewayError::blob(format!("failed to read blob {}: {e}", handle.name()))
            })?;
        Ok(BASE64.encode(bytes))
    }

    /// Delete a blob. Best-effort: never raises, logs failures, and is safe
    /// to call more than once for the same handle.
    pub async fn delete(&self, handle: &BlobHandle) {
        match tokio::fs::remove_file(&handle.path).await {
            Ok(()) => debug!(blob = %handle.name(), "Deleted blob"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(blob = %handle.name(), error = %e, "Failed to delete blob"),
        }
    }

    /// Sweep blobs older than `max_age`, returning how many were removed.
    /// Best-effort; individual failures are logged and skipped.
    pub async fn cleanup_stale(&self, max_age: Duration) -> usize {
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to scan blob store for stale blobs");
                return 0;
            }
        };

        let now = SystemTime::now();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(blob = %entry.path().display(), error = %e, "Failed to sweep stale blob"),
                }
            }
        }

        if removed > 0 {
            debug!(removed, "Swept stale blobs");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BlobStore::new(dir.path().join("blobs")).expect("store");
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_then_read_text() {
        let (_dir, store) = test_store();
        let handle = store.put(b"hello world", ".txt").await.expect("put");
        assert_eq!(store.read_text(&handle).await.expect("read"), "hello world");
    }

    #[tokio::test]
    async fn test_read_base64_round_trip() {
        let (_dir, store) = test_store();
        let handle = store.put(&[0xDE, 0xAD, 0xBE, 0xEF], ".png").await.expect("put");
        let encoded = store.read_base64(&handle).await.expect("read");
        assert_eq!(BASE64.decode(encoded).expect("decode"), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[tokio::test]
    async fn test_read_text_is_lossy_on_binary_content() {
        let (_dir, store) = test_store();
        // A PDF header followed by bytes that are not valid UTF-8.
        let handle = store
            .put(b"%PDF-1.4\n\xFF\xFE\x00binary", ".pdf")
            .await
            .expect("put");
        let text = store.read_text(&handle).await.expect("read");
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = test_store();
        let handle = store.put(b"bytes", ".txt").await.expect("put");
        store.delete(&handle).await;
        // Second delete on the same handle must not panic or error.
        store.delete(&handle).await;
        assert!(store.read_text(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_stale_skips_fresh_blobs() {
        let (_dir, store) = test_store();
        let _handle = store.put(b"fresh", ".txt").await.expect("put");
        let removed = store.cleanup_stale(Duration::from_secs(3600)).await;
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_cleanup_stale_removes_old_blobs() {
        let (_dir, store) = test_store();
        let _handle = store.put(b"old", ".txt").await.expect("put");
        // Zero max age treats everything already written as stale.
        let removed = store.cleanup_stale(Duration::ZERO).await;
        assert_eq!(removed, 1);
    }
}
