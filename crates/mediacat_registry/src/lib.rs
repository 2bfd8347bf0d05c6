//! Registry core for the mediacat media catalog.
//!
//! The registry is a single JSON document listing known media assets, cached
//! alongside the asset bytes in the same object-storage backend so listings
//! never re-scan the backend. This crate holds the document model, the
//! read-modify-write store, the two repair passes that keep the document
//! honest, and the lifecycle API callers actually invoke:
//!
//! - [`RegistryStore`]: whole-document read/write under one well-known key
//! - [`Reconciler`]: removes stale entries (and optionally adopts orphaned
//!   backend objects) by comparing the document against the live listing
//! - [`DedupeSweep`]: collapses racing registry documents into one
//!   canonical document
//! - [`MediaLibrary`]: list / add / delete with per-item failure reporting
//!
//! There is deliberately no locking and no compare-and-swap simulation:
//! concurrent writers can race, and correctness is restored after the fact
//! by the repair passes, which are idempotent and convergent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod asset;
mod dedupe;
mod library;
mod reconcile;
mod store;

pub use asset::{MediaAsset, RegistryDocument, creation_token, format_size_label};
pub use dedupe::{DedupeReport, DedupeSweep, ExcludedCandidate};
pub use library::{DeleteFailure, DeleteOutcome, MediaLibrary, NewMediaAsset};
pub use reconcile::{ReconcileMode, ReconcileReport, Reconciler};
pub use store::RegistryStore;

/// Well-known key of the canonical registry document.
pub const REGISTRY_KEY: &str = "media-registry.json";

/// Key stem matched by the dedup sweep; racing first-writes can leave
/// variant keys like `media-registry-x1y2.json` on backends with no atomic
/// conditional write.
pub const REGISTRY_STEM: &str = "media-registry";

/// Prefix under which asset objects are stored, keyed as
/// `media/<creationToken>_<sanitizedOriginalName>`.
pub const ASSET_PREFIX: &str = "media/";
