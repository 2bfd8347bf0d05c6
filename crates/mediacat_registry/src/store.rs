//! Whole-document registry persistence.

use crate::{REGISTRY_KEY, RegistryDocument};
use mediacat_error::{MediacatResult, RegistryError, RegistryErrorKind};
use mediacat_storage::ObjectStore;
use std::sync::Arc;

/// Reads and writes the registry document through an object store.
///
/// The document is replaced wholesale on every write; there is no partial
/// patch at this layer, so callers must read-modify-write. Concurrent
/// writes from separate processes can race (the backend has no atomic
/// conditional write) and this store makes no attempt to serialize them.
/// Split-brain documents are recovered by the dedup sweep.
#[derive(Clone)]
pub struct RegistryStore {
    store: Arc<dyn ObjectStore>,
}

impl RegistryStore {
    /// Create a store over the given backend.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Read the registry document.
    ///
    /// A missing document means first run and yields an empty document,
    /// not an error. A document that exists but does not parse is a
    /// [`RegistryErrorKind::Malformed`] error.
    #[tracing::instrument(skip(self))]
    pub async fn read(&self) -> MediacatResult<RegistryDocument> {
        match self.store.get(REGISTRY_KEY).await {
            Ok(bytes) => {
                let doc: RegistryDocument = serde_json::from_slice(&bytes).map_err(|e| {
                    RegistryError::new(RegistryErrorKind::Malformed(e.to_string()))
                })?;
                tracing::debug!(assets = doc.len(), "Read registry document");
                Ok(doc)
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("No registry document yet, starting empty");
                Ok(RegistryDocument::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the registry document wholesale.
    #[tracing::instrument(skip(self, doc), fields(assets = doc.len()))]
    pub async fn write(&self, doc: &RegistryDocument) -> MediacatResult<()> {
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| RegistryError::new(RegistryErrorKind::Serialize(e.to_string())))?;
        self.store
            .put(REGISTRY_KEY, &bytes, "application/json")
            .await?;
        tracing::info!(assets = doc.len(), "Wrote registry document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacat_storage::{FileSystemStore, MediaKind};
    use crate::MediaAsset;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> Arc<dyn ObjectStore> {
        Arc::new(FileSystemStore::new(dir.path(), "http://localhost/files").unwrap())
    }

    #[tokio::test]
    async fn test_first_read_is_empty_not_an_error() {
        let dir = TempDir::new().unwrap();
        let registry = RegistryStore::new(backend(&dir));

        let doc = registry.read().await.unwrap();
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let registry = RegistryStore::new(backend(&dir));

        let mut doc = RegistryDocument::new();
        doc.push(MediaAsset {
            id: "1700000000000".to_string(),
            name: "media/1700000000000_a.png".to_string(),
            original_name: "a.png".to_string(),
            url: "http://localhost/files/media/1700000000000_a.png".to_string(),
            kind: MediaKind::Image,
            size_label: "1.0 KB".to_string(),
            dimensions_label: None,
            uploaded_at: "2024-05-01T12:00:00+00:00".to_string(),
            deletable: true,
        });
        registry.write(&doc).await.unwrap();

        let read_back = registry.read().await.unwrap();
        assert_eq!(read_back, doc);
    }

    #[tokio::test]
    async fn test_malformed_document_is_typed() {
        let dir = TempDir::new().unwrap();
        let store = backend(&dir);
        store
            .put(REGISTRY_KEY, b"{not json", "application/json")
            .await
            .unwrap();

        let registry = RegistryStore::new(store);
        let err = registry.read().await.unwrap_err();
        assert!(format!("{}", err).contains("Malformed"));
    }
}
