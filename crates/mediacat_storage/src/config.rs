//! Backend selection configuration.
//!
//! The backend is chosen once per process from configuration and never mixed
//! within one registry lifecycle. Call sites receive an `Arc<dyn ObjectStore>`
//! and stay backend-agnostic.

use crate::{FileSystemStore, ObjectStore, RemoteStore};
use mediacat_error::{ConfigError, MediacatResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Which object-storage backend a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageBackend {
    /// Local filesystem under a media root (local/dev deployments)
    Filesystem,
    /// Remote blob store over HTTP (production deployments)
    Remote,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filesystem" => Ok(StorageBackend::Filesystem),
            "remote" => Ok(StorageBackend::Remote),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Filesystem => write!(f, "filesystem"),
            StorageBackend::Remote => write!(f, "remote"),
        }
    }
}

/// Storage configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: StorageBackend,
    /// Media root directory (filesystem backend)
    pub media_root: PathBuf,
    /// Public URL prefix for filesystem-served objects
    pub public_base_url: String,
    /// Blob API endpoint (remote backend)
    pub endpoint: Option<String>,
    /// Blob API bearer token (remote backend)
    pub token: Option<String>,
}

impl StorageConfig {
    /// Filesystem configuration.
    pub fn filesystem(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Filesystem,
            media_root: root.into(),
            public_base_url: public_base_url.into(),
            endpoint: None,
            token: None,
        }
    }

    /// Remote blob-store configuration.
    pub fn remote(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Remote,
            media_root: PathBuf::new(),
            public_base_url: String::new(),
            endpoint: Some(endpoint.into()),
            token: Some(token.into()),
        }
    }

    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `MEDIACAT_BACKEND` ("filesystem" or "remote", default "filesystem")
    /// - `MEDIACAT_MEDIA_ROOT` (filesystem, default "./media")
    /// - `MEDIACAT_PUBLIC_BASE_URL` (filesystem, default "http://localhost:8080/files")
    /// - `MEDIACAT_BLOB_ENDPOINT` (remote, required)
    /// - `MEDIACAT_BLOB_TOKEN` (remote, required)
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = std::env::var("MEDIACAT_BACKEND")
            .unwrap_or_else(|_| "filesystem".to_string())
            .parse::<StorageBackend>()
            .map_err(ConfigError::new)?;

        match backend {
            StorageBackend::Filesystem => {
                let root = std::env::var("MEDIACAT_MEDIA_ROOT")
                    .unwrap_or_else(|_| "./media".to_string());
                let public_base = std::env::var("MEDIACAT_PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/files".to_string());
                Ok(Self::filesystem(root, public_base))
            }
            StorageBackend::Remote => {
                let endpoint = std::env::var("MEDIACAT_BLOB_ENDPOINT").map_err(|_| {
                    ConfigError::new("MEDIACAT_BLOB_ENDPOINT not set for remote backend")
                })?;
                let token = std::env::var("MEDIACAT_BLOB_TOKEN").map_err(|_| {
                    ConfigError::new("MEDIACAT_BLOB_TOKEN not set for remote backend")
                })?;
                Ok(Self::remote(endpoint, token))
            }
        }
    }

    /// Instantiate the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the filesystem root cannot be created or the
    /// remote configuration is incomplete.
    #[tracing::instrument(skip(self), fields(backend = %self.backend))]
    pub fn connect(&self) -> MediacatResult<Arc<dyn ObjectStore>> {
        match self.backend {
            StorageBackend::Filesystem => {
                let store = FileSystemStore::new(&self.media_root, &self.public_base_url)?;
                Ok(Arc::new(store))
            }
            StorageBackend::Remote => {
                let endpoint = self
                    .endpoint
                    .as_deref()
                    .ok_or_else(|| ConfigError::new("Remote backend requires an endpoint"))?;
                let token = self
                    .token
                    .as_deref()
                    .ok_or_else(|| ConfigError::new("Remote backend requires a token"))?;
                Ok(Arc::new(RemoteStore::new(endpoint, token)))
            }
        }
    }
}
