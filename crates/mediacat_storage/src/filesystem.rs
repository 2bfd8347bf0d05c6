//! Filesystem-based object store implementation.
//!
//! Keys are relative paths under a media root directory; URLs are the key
//! appended to a configured public base. Suited for local and development
//! deployments where assets are served straight off disk.

use crate::{ObjectEntry, ObjectStore};
use chrono::{DateTime, Utc};
use mediacat_error::{BackendError, BackendErrorKind, MediacatResult};
use std::path::{Path, PathBuf};

/// Filesystem storage backend.
///
/// Stores objects as plain files:
/// `{root}/{key}` served as `{public_base}/{key}`.
///
/// # Features
///
/// - **Atomic writes**: temp file + rename
/// - **Typed absence**: missing keys surface as `NotFound`, never as a
///   generic I/O fault
///
/// Filesystem errors are never classified transient; local disk absence is
/// authoritative.
pub struct FileSystemStore {
    root: PathBuf,
    public_base: String,
}

/// Suffix appended to the full file name during an atomic write. The
/// tilde keeps temp names disjoint from sanitized object keys, which
/// never contain one.
const TEMP_SUFFIX: &str = ".tmp~";

impl FileSystemStore {
    /// Create a new filesystem store rooted at `root`.
    ///
    /// Creates the root directory if it doesn't exist. `public_base` is the
    /// URL prefix under which the root is served.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    #[tracing::instrument(skip(root, public_base))]
    pub fn new(
        root: impl Into<PathBuf>,
        public_base: impl Into<String>,
    ) -> MediacatResult<Self> {
        let root = root.into();
        let public_base = public_base.into().trim_end_matches('/').to_string();

        std::fs::create_dir_all(&root).map_err(|e| {
            BackendError::new(BackendErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        tracing::info!(path = %root.display(), "Created filesystem store");
        Ok(Self { root, public_base })
    }

    /// Resolve a key to an on-disk path, rejecting traversal outside the root.
    fn path_for(&self, key: &str) -> MediacatResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') {
            return Err(BackendError::new(BackendErrorKind::InvalidKey(key.to_string())).into());
        }
        if Path::new(key)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(BackendError::new(BackendErrorKind::InvalidKey(key.to_string())).into());
        }
        Ok(self.root.join(key))
    }

    /// URL under which `key` is served.
    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    /// Accepts either a key or a URL under the public base.
    fn key_from_target<'a>(&self, target: &'a str) -> &'a str {
        match target.strip_prefix(&self.public_base) {
            Some(rest) => rest.trim_start_matches('/'),
            None => target,
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for FileSystemStore {
    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> MediacatResult<Vec<ObjectEntry>> {
        let mut entries = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                // The root is created eagerly, so a vanished subdirectory
                // just means nothing is stored under it.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(BackendError::new(BackendErrorKind::List(format!(
                        "{}: {}",
                        dir.display(),
                        e
                    )))
                    .into());
                }
            };

            while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
                BackendError::new(BackendErrorKind::List(format!("{}: {}", dir.display(), e)))
            })? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| {
                    BackendError::new(BackendErrorKind::List(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )))
                })?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }

                let key = match path.strip_prefix(&self.root) {
                    Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                    Err(_) => continue,
                };
                // In-flight atomic writes are not listable objects.
                if key.ends_with(TEMP_SUFFIX) || !key.starts_with(prefix) {
                    continue;
                }

                let metadata = entry.metadata().await.ok();
                let size = metadata.as_ref().map(|m| m.len());
                let uploaded_at = metadata
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from);

                entries.push(ObjectEntry {
                    url: self.url_for(&key),
                    key,
                    size,
                    uploaded_at,
                });
            }
        }

        tracing::debug!(prefix, count = entries.len(), "Listed filesystem objects");
        Ok(entries)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> MediacatResult<Vec<u8>> {
        let path = self.path_for(key)?;

        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::new(BackendErrorKind::NotFound(key.to_string()))
            } else {
                BackendError::new(BackendErrorKind::Read(format!("{}: {}", path.display(), e)))
            }
        })?;

        tracing::debug!(key, size = data.len(), "Read filesystem object");
        Ok(data)
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> MediacatResult<String> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                BackendError::new(BackendErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        // Write to temp file first, then rename for atomicity. The suffix
        // is appended to the whole name so keys differing only in
        // extension never share a temp file.
        let temp_path = {
            let mut name = path.clone().into_os_string();
            name.push(TEMP_SUFFIX);
            PathBuf::from(name)
        };
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            BackendError::new(BackendErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            BackendError::new(BackendErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(key, size = data.len(), "Stored filesystem object");
        Ok(self.url_for(key))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, target: &str) -> MediacatResult<()> {
        let key = self.key_from_target(target);
        let path = self.path_for(key)?;

        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::new(BackendErrorKind::NotFound(key.to_string()))
            } else {
                BackendError::new(BackendErrorKind::Write(format!(
                    "delete {}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        tracing::info!(key, "Deleted filesystem object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FileSystemStore {
        FileSystemStore::new(dir.path(), "http://localhost:8080/files").unwrap()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let url = store
            .put("media/1_logo.png", b"png bytes", "image/png")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8080/files/media/1_logo.png");

        let data = store.get("media/1_logo.png").await.unwrap();
        assert_eq!(data, b"png bytes");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let err = store.get("media/missing.png").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.put("media/1_a.png", b"a", "image/png").await.unwrap();
        store.put("media/2_b.mp4", b"b", "video/mp4").await.unwrap();
        store
            .put("media-registry.json", b"[]", "application/json")
            .await
            .unwrap();

        let media = store.list("media/").await.unwrap();
        let mut keys: Vec<_> = media.iter().map(|e| e.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["media/1_a.png", "media/2_b.mp4"]);
        assert_eq!(media[0].size, Some(1));

        let registry = store.list("media-registry").await.unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry[0].key, "media-registry.json");
    }

    #[tokio::test]
    async fn test_delete_by_key_and_url() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let url = store.put("media/1_a.png", b"a", "image/png").await.unwrap();
        store.delete(&url).await.unwrap();

        let err = store.delete("media/1_a.png").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_key_ending_in_tmp_is_listable() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .put("media/1_notes.tmp", b"scratch", "application/octet-stream")
            .await
            .unwrap();

        let listed = store.list("media/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "media/1_notes.tmp");
        assert_eq!(store.get("media/1_notes.tmp").await.unwrap(), b"scratch");
    }

    #[tokio::test]
    async fn test_concurrent_puts_differing_only_in_extension() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let (png, mp4) = tokio::join!(
            store.put("media/1_a.png", b"png bytes", "image/png"),
            store.put("media/1_a.mp4", b"mp4 bytes", "video/mp4"),
        );
        png.unwrap();
        mp4.unwrap();

        assert_eq!(store.get("media/1_a.png").await.unwrap(), b"png bytes");
        assert_eq!(store.get("media/1_a.mp4").await.unwrap(), b"mp4 bytes");
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.get("../outside").await.is_err());
        assert!(store.put("/abs/path", b"x", "file").await.is_err());
    }
}
