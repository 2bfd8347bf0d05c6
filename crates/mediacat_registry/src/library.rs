//! The asset lifecycle API: list, add, delete.

use crate::{
    ASSET_PREFIX, MediaAsset, RegistryStore, creation_token, format_size_label,
};
use mediacat_error::{MediacatResult, RegistryError, RegistryErrorKind};
use mediacat_notify::{ChangeEvent, ChangeHub};
use mediacat_storage::{MediaKind, ObjectStore, sanitize_file_name};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Metadata for a new asset.
///
/// Callers that already placed the bytes (direct upload) supply `url`;
/// otherwise they supply `bytes` and the library stores them through the
/// backend. `id` is assigned when not supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaAsset {
    /// Human-supplied filename
    pub original_name: String,
    /// MIME content type, decides the asset kind
    pub content_type: String,
    /// Pre-assigned creation token, if the caller allocated one
    #[serde(default)]
    pub id: Option<String>,
    /// Resolved URL when the caller already placed the bytes
    #[serde(default)]
    pub url: Option<String>,
    /// Display-size override
    #[serde(default)]
    pub size_label: Option<String>,
    /// Display-dimensions text
    #[serde(default)]
    pub dimensions_label: Option<String>,
    /// Payload to store, for callers that did not upload directly
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
}

/// Result of a batch delete: per-id successes and failures, never
/// all-or-nothing.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// Ids whose backend bytes and registry entries were removed
    pub deleted_files: Vec<String>,
    /// Ids that could not be removed, with reasons
    pub errors: Vec<DeleteFailure>,
}

/// One failed id in a batch delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    /// The id that failed
    pub id: String,
    /// Why it failed
    pub reason: String,
}

/// The operations callers invoke: list, add, delete.
///
/// All registry mutation is read-modify-write with no locking; lost
/// updates are an accepted, recoverable condition repaired by the
/// maintenance passes.
#[derive(Clone)]
pub struct MediaLibrary {
    store: Arc<dyn ObjectStore>,
    registry: RegistryStore,
    hub: ChangeHub,
}

impl MediaLibrary {
    /// Create a library over the given backend, registry, and hub.
    pub fn new(store: Arc<dyn ObjectStore>, registry: RegistryStore, hub: ChangeHub) -> Self {
        Self {
            store,
            registry,
            hub,
        }
    }

    /// Current registry assets, newest first. No side effects.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> MediacatResult<Vec<MediaAsset>> {
        let mut doc = self.registry.read().await?;
        doc.sort_newest_first();
        Ok(doc.assets)
    }

    /// Register a new asset and return it.
    ///
    /// Publishes an `upload` event on success.
    ///
    /// # Errors
    ///
    /// Rejects metadata that carries neither a URL nor bytes, since there
    /// would be nothing to reference.
    #[tracing::instrument(skip(self, new), fields(original_name = %new.original_name))]
    pub async fn add(&self, new: NewMediaAsset) -> MediacatResult<MediaAsset> {
        let id = new.id.unwrap_or_else(creation_token);
        let name = format!(
            "{}{}_{}",
            ASSET_PREFIX,
            id,
            sanitize_file_name(&new.original_name)
        );

        let size_hint = new.bytes.as_ref().map(|b| b.len() as u64);
        let url = match (new.url, new.bytes) {
            (Some(url), _) => url,
            (None, Some(bytes)) => self.store.put(&name, &bytes, &new.content_type).await?,
            (None, None) => {
                return Err(RegistryError::new(RegistryErrorKind::InvalidAsset(
                    "neither url nor bytes supplied".to_string(),
                )))?;
            }
        };

        let asset = MediaAsset {
            id,
            name,
            original_name: new.original_name,
            url,
            kind: MediaKind::from_content_type(&new.content_type),
            size_label: new
                .size_label
                .or(size_hint.map(format_size_label))
                .unwrap_or_default(),
            dimensions_label: new.dimensions_label,
            uploaded_at: chrono::Utc::now().to_rfc3339(),
            deletable: true,
        };

        let mut doc = self.registry.read().await?;
        doc.push(asset.clone());
        self.registry.write(&doc).await?;

        self.hub.publish(ChangeEvent::Upload {
            file: serde_json::to_value(&asset).unwrap_or_default(),
        });
        tracing::info!(id = %asset.id, kind = %asset.kind, "Registered media asset");
        Ok(asset)
    }

    /// Delete assets by id: backend bytes first, then the registry entry.
    ///
    /// Failures are collected per id; the rest of the batch proceeds. An
    /// id whose backing object is already gone keeps its registry entry
    /// (reported as an error) for a later reconcile pass to converge on.
    /// Publishes a `delete` event summarizing the batch.
    #[tracing::instrument(skip(self), fields(count = ids.len()))]
    pub async fn delete(&self, ids: &[String]) -> MediacatResult<DeleteOutcome> {
        let mut doc = self.registry.read().await?;
        let mut outcome = DeleteOutcome::default();

        for id in ids {
            let Some(asset) = doc.find(id) else {
                outcome.errors.push(DeleteFailure {
                    id: id.clone(),
                    reason: "not in registry".to_string(),
                });
                continue;
            };
            if !asset.deletable {
                outcome.errors.push(DeleteFailure {
                    id: id.clone(),
                    reason: "asset is not deletable".to_string(),
                });
                continue;
            }

            let target = match self.locate(asset).await {
                Some(target) => target,
                None => {
                    outcome.errors.push(DeleteFailure {
                        id: id.clone(),
                        reason: "backing object not found".to_string(),
                    });
                    continue;
                }
            };

            match self.store.delete(&target).await {
                Ok(()) => {
                    doc.remove(id);
                    outcome.deleted_files.push(id.clone());
                }
                Err(e) if e.is_not_found() => {
                    outcome.errors.push(DeleteFailure {
                        id: id.clone(),
                        reason: "backing object not found".to_string(),
                    });
                }
                Err(e) => {
                    outcome.errors.push(DeleteFailure {
                        id: id.clone(),
                        reason: format!("{}", e),
                    });
                }
            }
        }

        if !outcome.deleted_files.is_empty() {
            self.registry.write(&doc).await?;
        }

        self.hub.publish(ChangeEvent::Delete {
            deleted_files: outcome.deleted_files.clone(),
            errors: outcome
                .errors
                .iter()
                .map(|f| format!("{}: {}", f.id, f.reason))
                .collect(),
        });
        tracing::info!(
            deleted = outcome.deleted_files.len(),
            failed = outcome.errors.len(),
            "Batch delete complete"
        );
        Ok(outcome)
    }

    /// Resolve the backend key for an asset: the recorded name when
    /// present, otherwise a key-prefix match against the listing by id.
    async fn locate(&self, asset: &MediaAsset) -> Option<String> {
        if !asset.name.is_empty() {
            return Some(asset.name.clone());
        }
        let prefix = format!("{}{}", ASSET_PREFIX, asset.id);
        let listing = self.store.list(&prefix).await.ok()?;
        listing.into_iter().next().map(|e| e.key)
    }
}
