//! Collapse racing registry documents into one canonical document.

use crate::{REGISTRY_KEY, REGISTRY_STEM, RegistryDocument, RegistryStore};
use mediacat_error::MediacatResult;
use mediacat_notify::{ChangeEvent, ChangeHub};
use mediacat_storage::{ObjectEntry, ObjectStore};
use serde::Serialize;
use std::sync::Arc;

/// A candidate document excluded from canonical selection, with the reason
/// it was passed over. Never silently dropped from the report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedCandidate {
    /// Storage key of the candidate
    pub key: String,
    /// Why it was excluded (unreachable, unparseable)
    pub reason: String,
}

/// Outcome of one deduplication sweep.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupeReport {
    /// Keys matching the registry document pattern
    pub candidates: usize,
    /// Key whose content was chosen as canonical
    pub kept_key: Option<String>,
    /// Asset count of the canonical document
    pub kept_assets: usize,
    /// Variant keys deleted after the canonical rewrite
    pub removed_keys: Vec<String>,
    /// Candidates that could not be considered
    pub excluded: Vec<ExcludedCandidate>,
    /// Delete failures and other non-fatal problems
    pub errors: Vec<String>,
}

/// Recovers from multiple registry documents created when concurrent
/// first-writes race.
///
/// The backend has no atomic compare-and-swap, so two processes that each
/// believe no document exists can each create one under slightly different
/// keys. The sweep picks the candidate with the most assets (maximizing
/// retained metadata over recency), rewrites it under the well-known key,
/// and only then deletes the others, so there is never a window with zero
/// valid documents.
#[derive(Clone)]
pub struct DedupeSweep {
    store: Arc<dyn ObjectStore>,
    registry: RegistryStore,
    hub: ChangeHub,
}

impl DedupeSweep {
    /// Create a sweep over the given backend, registry, and hub.
    pub fn new(store: Arc<dyn ObjectStore>, registry: RegistryStore, hub: ChangeHub) -> Self {
        Self {
            store,
            registry,
            hub,
        }
    }

    /// Run one deduplication sweep.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> MediacatResult<DedupeReport> {
        let listing = self.store.list(REGISTRY_STEM).await?;
        let candidates: Vec<ObjectEntry> = listing
            .into_iter()
            .filter(|e| is_registry_key(&e.key))
            .collect();

        let mut report = DedupeReport {
            candidates: candidates.len(),
            ..DedupeReport::default()
        };

        if candidates.is_empty() {
            tracing::debug!("No registry documents to deduplicate");
            return Ok(report);
        }

        // Only candidates whose bytes were actually read may be swept.
        // An unreachable candidate (transient fetch failure) might be the
        // most complete document; it stays in place and is reported.
        let mut variant_keys: Vec<String> = Vec::new();
        let mut parsed: Vec<(ObjectEntry, RegistryDocument)> = Vec::new();
        for entry in candidates {
            match self.store.get(&entry.key).await {
                Ok(bytes) => {
                    if entry.key != REGISTRY_KEY {
                        variant_keys.push(entry.key.clone());
                    }
                    match serde_json::from_slice::<RegistryDocument>(&bytes) {
                        Ok(doc) => parsed.push((entry, doc)),
                        Err(e) => {
                            tracing::warn!(key = %entry.key, error = %e, "Excluding unparseable candidate");
                            report.excluded.push(ExcludedCandidate {
                                key: entry.key,
                                reason: format!("unparseable: {}", e),
                            });
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(key = %entry.key, error = %e, "Leaving unreachable candidate in place");
                    report.excluded.push(ExcludedCandidate {
                        key: entry.key,
                        reason: format!("unreachable: {}", e),
                    });
                }
            }
        }

        // The sweep must leave at least one valid canonical document
        // behind before attempting any deletion; with nothing readable it
        // repairs nothing.
        let Some((winner_entry, winner_doc)) = pick_canonical(&parsed) else {
            report
                .errors
                .push("no readable registry document candidate".to_string());
            return Ok(report);
        };
        report.kept_key = Some(winner_entry.key.clone());
        report.kept_assets = winner_doc.len();

        if variant_keys.is_empty() && winner_entry.key == REGISTRY_KEY {
            tracing::debug!("Registry already canonical, nothing to sweep");
            return Ok(report);
        }

        // What the well-known key held before, for the mutation event.
        let total_before = parsed
            .iter()
            .find(|(e, _)| e.key == REGISTRY_KEY)
            .map(|(_, d)| d.len())
            .unwrap_or(0);

        // Write first, delete after. A delete-then-write ordering could
        // leave zero valid documents behind.
        if winner_entry.key != REGISTRY_KEY {
            self.registry.write(winner_doc).await?;
        }

        for key in &variant_keys {
            match self.store.delete(key).await {
                Ok(()) => {
                    tracing::info!(key = %key, "Deleted duplicate registry document");
                    report.removed_keys.push(key.clone());
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to delete duplicate document");
                    report.errors.push(format!("{}: {}", key, e));
                }
            }
        }

        self.hub.publish(ChangeEvent::Update {
            total_before,
            total_after: report.kept_assets,
            removed: Vec::new(),
        });

        tracing::info!(
            candidates = report.candidates,
            kept = ?report.kept_key,
            removed = report.removed_keys.len(),
            excluded = report.excluded.len(),
            "Dedup sweep complete"
        );
        Ok(report)
    }
}

/// Keys matching the registry document pattern: the canonical key plus any
/// variant/suffixed keys produced by races.
fn is_registry_key(key: &str) -> bool {
    key.starts_with(REGISTRY_STEM) && key.ends_with(".json") && !key.contains('/')
}

/// Greatest asset count wins; ties break to the most recently written
/// candidate, else the first encountered.
fn pick_canonical(
    parsed: &[(ObjectEntry, RegistryDocument)],
) -> Option<&(ObjectEntry, RegistryDocument)> {
    parsed.iter().reduce(|best, candidate| {
        let (best_entry, best_doc) = best;
        let (entry, doc) = candidate;
        match doc.len().cmp(&best_doc.len()) {
            std::cmp::Ordering::Greater => candidate,
            std::cmp::Ordering::Equal if entry.uploaded_at > best_entry.uploaded_at => candidate,
            _ => best,
        }
    })
}
