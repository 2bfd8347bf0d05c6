//! Drift repair between the registry document and the backend listing.

use crate::{ASSET_PREFIX, MediaAsset, RegistryDocument, RegistryStore};
use mediacat_error::MediacatResult;
use mediacat_notify::{ChangeEvent, ChangeHub};
use mediacat_storage::ObjectStore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// How aggressively a reconcile pass repairs the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Remove stale entries only
    Repair,
    /// Remove stale entries and adopt orphaned backend objects into the
    /// registry (import/seed runs)
    Seed,
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Asset count before the pass
    pub total_before: usize,
    /// Asset count after the pass
    pub total_after: usize,
    /// Ids removed as stale
    pub removed: Vec<String>,
    /// Ids synthesized from orphaned objects (seed mode only)
    pub adopted: Vec<String>,
    /// Ids whose backing state could not be determined (transient failure);
    /// left untouched for operator visibility
    pub unknown: Vec<String>,
    /// Human-readable failure notes
    pub errors: Vec<String>,
}

impl ReconcileReport {
    /// Whether the pass altered the registry document.
    pub fn changed(&self) -> bool {
        !self.removed.is_empty() || !self.adopted.is_empty()
    }
}

/// Compares the registry's claims against what the backend actually
/// reports, and repairs the difference.
///
/// The pass is idempotent: re-running it with no intervening backend
/// change converges to the same fixed point and removes nothing. Running
/// concurrently with an in-flight `add` is tolerated for the same reason.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    registry: RegistryStore,
    hub: ChangeHub,
}

impl Reconciler {
    /// Create a reconciler over the given backend, registry, and hub.
    pub fn new(store: Arc<dyn ObjectStore>, registry: RegistryStore, hub: ChangeHub) -> Self {
        Self {
            store,
            registry,
            hub,
        }
    }

    /// Run one reconcile pass.
    ///
    /// Deletable assets whose URL is absent from the backend listing get a
    /// confirming probe: a typed not-found marks them stale and they are
    /// removed; a transient failure classifies them `unknown` and they are
    /// kept; a flaky network must never delete live references. Assets
    /// with `deletable = false` are never touched regardless of listing
    /// state.
    #[tracing::instrument(skip(self), fields(mode = ?mode))]
    pub async fn reconcile(&self, mode: ReconcileMode) -> MediacatResult<ReconcileReport> {
        let doc = self.registry.read().await?;
        let listing = self.store.list(ASSET_PREFIX).await?;

        let listed_urls: HashSet<&str> = listing.iter().map(|e| e.url.as_str()).collect();
        let registered_urls: HashSet<String> =
            doc.assets.iter().map(|a| a.url.clone()).collect();

        let mut report = ReconcileReport {
            total_before: doc.len(),
            ..ReconcileReport::default()
        };
        let mut kept = Vec::with_capacity(doc.len());

        for asset in doc.assets {
            if !asset.deletable || listed_urls.contains(asset.url.as_str()) {
                kept.push(asset);
                continue;
            }
            match self.probe(&asset).await {
                Probe::Absent => {
                    tracing::info!(id = %asset.id, url = %asset.url, "Removing stale registry entry");
                    report.removed.push(asset.id);
                }
                Probe::Present => kept.push(asset),
                Probe::Unknown(reason) => {
                    tracing::warn!(id = %asset.id, reason = %reason, "Backing state unknown, keeping entry");
                    report.unknown.push(asset.id.clone());
                    report.errors.push(format!("{}: {}", asset.id, reason));
                    kept.push(asset);
                }
            }
        }

        if mode == ReconcileMode::Seed {
            // A direct-upload asset may record an external URL while its
            // bytes sit under its key; matching by URL alone would adopt
            // that key as a second asset with the same id.
            let mut known_names: HashSet<String> =
                kept.iter().map(|a| a.name.clone()).collect();
            let mut known_ids: HashSet<String> = kept.iter().map(|a| a.id.clone()).collect();

            for entry in &listing {
                if registered_urls.contains(&entry.url) || known_names.contains(&entry.key) {
                    continue;
                }
                let adopted = MediaAsset::from_listing(entry);
                if known_ids.contains(&adopted.id) {
                    tracing::debug!(id = %adopted.id, key = %entry.key, "Skipping orphan with a registered id");
                    continue;
                }
                tracing::info!(id = %adopted.id, key = %entry.key, "Adopting orphaned object");
                known_ids.insert(adopted.id.clone());
                known_names.insert(adopted.name.clone());
                report.adopted.push(adopted.id.clone());
                kept.push(adopted);
            }
        }

        let mut repaired = RegistryDocument { assets: kept };
        repaired.sort_newest_first();
        report.total_after = repaired.len();

        if report.changed() {
            self.registry.write(&repaired).await?;
            self.hub.publish(ChangeEvent::Update {
                total_before: report.total_before,
                total_after: report.total_after,
                removed: report.removed.clone(),
            });
        }

        tracing::info!(
            before = report.total_before,
            after = report.total_after,
            removed = report.removed.len(),
            adopted = report.adopted.len(),
            unknown = report.unknown.len(),
            "Reconcile pass complete"
        );
        Ok(report)
    }

    /// Confirm absence for an asset missing from the listing. The probe
    /// reuses the adapter's `get`, whose typed errors separate a
    /// definitive 404 from a network hiccup.
    async fn probe(&self, asset: &MediaAsset) -> Probe {
        match self.store.get(&asset.name).await {
            // Listing lagged behind a fresh upload; the bytes exist.
            Ok(_) => Probe::Present,
            Err(e) if e.is_not_found() => Probe::Absent,
            Err(e) => Probe::Unknown(format!("{}", e)),
        }
    }
}

enum Probe {
    Present,
    Absent,
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacat_error::{BackendError, BackendErrorKind};
    use mediacat_storage::{FileSystemStore, MediaKind, ObjectEntry};
    use tempfile::TempDir;

    fn asset(id: &str, url: &str, deletable: bool) -> MediaAsset {
        MediaAsset {
            id: id.to_string(),
            name: format!("media/{}_pic.png", id),
            original_name: "pic.png".to_string(),
            url: url.to_string(),
            kind: MediaKind::Image,
            size_label: String::new(),
            dimensions_label: None,
            uploaded_at: "2024-05-01T12:00:00+00:00".to_string(),
            deletable,
        }
    }

    fn fixture(dir: &TempDir) -> (Arc<dyn ObjectStore>, RegistryStore, ChangeHub) {
        let store: Arc<dyn ObjectStore> =
            Arc::new(FileSystemStore::new(dir.path(), "http://localhost/files").unwrap());
        let registry = RegistryStore::new(store.clone());
        (store, registry, ChangeHub::new())
    }

    #[tokio::test]
    async fn test_removes_exactly_the_stale_entry() {
        let dir = TempDir::new().unwrap();
        let (store, registry, hub) = fixture(&dir);

        let live_url = store
            .put("media/1_pic.png", b"live", "image/png")
            .await
            .unwrap();
        let mut doc = RegistryDocument::new();
        doc.push(asset("1", &live_url, true));
        doc.push(asset("2", "http://localhost/files/media/2_pic.png", true));
        registry.write(&doc).await.unwrap();

        let reconciler = Reconciler::new(store, registry.clone(), hub);
        let report = reconciler.reconcile(ReconcileMode::Repair).await.unwrap();

        assert_eq!(report.total_before, 2);
        assert_eq!(report.total_after, 1);
        assert_eq!(report.removed, vec!["2"]);
        assert!(report.unknown.is_empty());

        let repaired = registry.read().await.unwrap();
        assert!(repaired.find("1").is_some());
        assert!(repaired.find("2").is_none());
    }

    #[tokio::test]
    async fn test_non_deletable_entries_are_immune() {
        let dir = TempDir::new().unwrap();
        let (store, registry, hub) = fixture(&dir);

        let mut doc = RegistryDocument::new();
        // Bundled asset: no backing object anywhere in the backend.
        doc.push(asset("10", "http://localhost/static/logo.svg", false));
        registry.write(&doc).await.unwrap();

        let reconciler = Reconciler::new(store, registry.clone(), hub);
        let report = reconciler.reconcile(ReconcileMode::Repair).await.unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(registry.read().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (store, registry, hub) = fixture(&dir);

        let live_url = store
            .put("media/1_pic.png", b"live", "image/png")
            .await
            .unwrap();
        let mut doc = RegistryDocument::new();
        doc.push(asset("1", &live_url, true));
        doc.push(asset("2", "http://localhost/files/media/2_pic.png", true));
        registry.write(&doc).await.unwrap();

        let reconciler = Reconciler::new(store, registry.clone(), hub);
        let first = reconciler.reconcile(ReconcileMode::Repair).await.unwrap();
        assert_eq!(first.removed.len(), 1);

        let before = registry.read().await.unwrap();
        let second = reconciler.reconcile(ReconcileMode::Repair).await.unwrap();
        assert_eq!(second.removed.len(), 0);
        assert_eq!(registry.read().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_seed_mode_adopts_orphans() {
        let dir = TempDir::new().unwrap();
        let (store, registry, hub) = fixture(&dir);

        store
            .put("media/1700000000000_found.mp4", b"vid", "video/mp4")
            .await
            .unwrap();

        let reconciler = Reconciler::new(store, registry.clone(), hub);

        let quiet = reconciler.reconcile(ReconcileMode::Repair).await.unwrap();
        assert!(quiet.adopted.is_empty());

        let seeded = reconciler.reconcile(ReconcileMode::Seed).await.unwrap();
        assert_eq!(seeded.adopted, vec!["1700000000000"]);

        let doc = registry.read().await.unwrap();
        let adopted = doc.find("1700000000000").unwrap();
        assert_eq!(adopted.original_name, "found.mp4");
        assert_eq!(adopted.kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_seed_skips_objects_backing_a_registered_asset() {
        let dir = TempDir::new().unwrap();
        let (store, registry, hub) = fixture(&dir);

        // Direct upload: bytes under the asset's key, but the registered
        // URL points at an external host.
        store
            .put("media/1700000000000_cover.png", b"png", "image/png")
            .await
            .unwrap();
        let mut doc = RegistryDocument::new();
        let mut registered = asset("1700000000000", "https://cdn.example.net/cover.png", true);
        registered.name = "media/1700000000000_cover.png".to_string();
        doc.push(registered);
        registry.write(&doc).await.unwrap();

        let reconciler = Reconciler::new(store, registry.clone(), hub);
        let report = reconciler.reconcile(ReconcileMode::Seed).await.unwrap();

        assert!(report.adopted.is_empty());
        assert!(report.removed.is_empty());

        let doc = registry.read().await.unwrap();
        let matching = doc
            .assets
            .iter()
            .filter(|a| a.id == "1700000000000")
            .count();
        assert_eq!(matching, 1);
        assert_eq!(doc.len(), 1);
    }

    #[tokio::test]
    async fn test_update_event_published_on_change() {
        let dir = TempDir::new().unwrap();
        let (store, registry, hub) = fixture(&dir);

        let mut doc = RegistryDocument::new();
        doc.push(asset("2", "http://localhost/files/media/2_pic.png", true));
        registry.write(&doc).await.unwrap();

        let mut sub = hub.subscribe();
        let reconciler = Reconciler::new(store, registry, hub);
        reconciler.reconcile(ReconcileMode::Repair).await.unwrap();

        assert_eq!(sub.recv().await, Some(ChangeEvent::Connected));
        assert_eq!(
            sub.recv().await,
            Some(ChangeEvent::Update {
                total_before: 1,
                total_after: 0,
                removed: vec!["2".to_string()],
            })
        );
    }

    /// Backend double whose listing omits everything and whose probes fail
    /// transiently: simulates a flaky network, where nothing may be
    /// classified stale.
    struct FlakyStore;

    #[async_trait::async_trait]
    impl ObjectStore for FlakyStore {
        async fn list(&self, _prefix: &str) -> MediacatResult<Vec<ObjectEntry>> {
            Ok(Vec::new())
        }

        async fn get(&self, key: &str) -> MediacatResult<Vec<u8>> {
            if key == crate::REGISTRY_KEY {
                let doc = RegistryDocument {
                    assets: vec![MediaAsset {
                        id: "7".to_string(),
                        name: "media/7_pic.png".to_string(),
                        original_name: "pic.png".to_string(),
                        url: "http://cdn/media/7_pic.png".to_string(),
                        kind: MediaKind::Image,
                        size_label: String::new(),
                        dimensions_label: None,
                        uploaded_at: "2024-05-01T12:00:00+00:00".to_string(),
                        deletable: true,
                    }],
                };
                return Ok(serde_json::to_vec(&doc).unwrap());
            }
            Err(BackendError::new(BackendErrorKind::Transient(
                "connection reset".to_string(),
            )))?
        }

        async fn put(&self, _key: &str, _data: &[u8], _ct: &str) -> MediacatResult<String> {
            panic!("a transiently failing probe must not trigger a registry write");
        }

        async fn delete(&self, _target: &str) -> MediacatResult<()> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_transient_probe_failure_is_unknown_not_stale() {
        let store: Arc<dyn ObjectStore> = Arc::new(FlakyStore);
        let registry = RegistryStore::new(store.clone());
        let reconciler = Reconciler::new(store, registry, ChangeHub::new());

        let report = reconciler.reconcile(ReconcileMode::Repair).await.unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.unknown, vec!["7"]);
        assert_eq!(report.total_before, report.total_after);
        assert_eq!(report.errors.len(), 1);
    }
}
