//! Pluggable object-storage backends for the mediacat media registry.
//!
//! This crate provides the storage abstraction that lets asset bytes and the
//! registry document live in either a local filesystem or a remote object
//! store without leaking backend details to callers.
//!
//! # Features
//!
//! - **Pluggable backends**: trait-based abstraction with filesystem and
//!   remote (HTTP blob API) implementations
//! - **Typed absence**: a missing key surfaces as a `NotFound` error kind,
//!   distinct from transient I/O failure; reconciliation depends on the
//!   difference
//! - **One-time selection**: the backend is chosen once per process from
//!   configuration, never mixed within a registry lifecycle
//!
//! # Example
//!
//! ```no_run
//! use mediacat_storage::{FileSystemStore, ObjectStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileSystemStore::new("/tmp/media", "http://localhost:8080/files")?;
//!
//! let url = store.put("media/1700000000000_cover.png", b"png bytes", "image/png").await?;
//! let bytes = store.get("media/1700000000000_cover.png").await?;
//! store.delete(&url).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use mediacat_error::MediacatResult;

mod config;
mod filesystem;
mod key;
mod kind;
mod remote;

pub use config::{StorageBackend, StorageConfig};
pub use filesystem::FileSystemStore;
pub use key::sanitize_file_name;
pub use kind::MediaKind;
pub use mediacat_error::{BackendError, BackendErrorKind};
pub use remote::RemoteStore;

/// Trait for pluggable object-storage backends.
///
/// Implementations store both asset payloads and the registry document
/// itself. `put` and `delete` mutate durable state immediately; nothing is
/// buffered. `get` and `delete` on a missing key return a typed
/// [`BackendErrorKind::NotFound`], which callers treat as a normal branch,
/// not a fault.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects whose key starts with `prefix`.
    ///
    /// The listing is ground truth for "do this object's bytes still
    /// exist"; size and timestamp are best-effort hints.
    async fn list(&self, prefix: &str) -> MediacatResult<Vec<ObjectEntry>>;

    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> MediacatResult<Vec<u8>>;

    /// Store `data` under `key` and return the resolved fetch URL.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> MediacatResult<String>;

    /// Delete the object identified by `target`, which may be a key or a
    /// previously returned URL.
    async fn delete(&self, target: &str) -> MediacatResult<()>;
}

/// One row of a backend object listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    /// Backend-relative storage key
    pub key: String,
    /// Fully resolved fetch URL
    pub url: String,
    /// Object size in bytes, when the backend reports it
    pub size: Option<u64>,
    /// Last write time, when the backend reports it
    pub uploaded_at: Option<DateTime<Utc>>,
}
