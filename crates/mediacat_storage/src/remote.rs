//! Remote object-store implementation over a bearer-token blob HTTP API.
//!
//! Keys are object names under a blob namespace. The wire protocol:
//!
//! - `PUT {endpoint}/{key}` with the object bytes → `{ "url": "..." }`
//! - `GET {endpoint}?prefix=...` → `{ "objects": [{ "key", "url", "size", "uploadedAt" }] }`
//! - `GET {endpoint}/{key}` → object bytes
//! - `DELETE {endpoint}/{key}` → 2xx, or 404 for a missing object
//!
//! The status-code mapping is load-bearing: HTTP 404 becomes a typed
//! `NotFound`, while connection failures and 5xx become `Transient`.
//! Reconciliation must never mistake a flaky network for a deleted object.

use crate::{ObjectEntry, ObjectStore};
use chrono::{DateTime, Utc};
use mediacat_error::{BackendError, BackendErrorKind, MediacatResult};
use reqwest::StatusCode;
use serde::Deserialize;

/// Remote blob-store backend.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    objects: Vec<ListedObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedObject {
    key: String,
    url: String,
    size: Option<u64>,
    uploaded_at: Option<DateTime<Utc>>,
}

impl RemoteStore {
    /// Create a new remote store client for `endpoint`, authenticated with
    /// the bearer `token`.
    #[tracing::instrument(skip(endpoint, token))]
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        tracing::debug!(endpoint = %endpoint, "Creating remote store client");
        Self {
            endpoint,
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }

    /// Accepts a key, an object URL under this endpoint, or a public URL
    /// whose path is the key.
    fn key_from_target<'a>(&self, target: &'a str) -> &'a str {
        if let Some(rest) = target.strip_prefix(&self.endpoint) {
            return rest.trim_start_matches('/');
        }
        if let Some(scheme_end) = target.find("://") {
            let after_scheme = &target[scheme_end + 3..];
            if let Some(slash) = after_scheme.find('/') {
                return &after_scheme[slash + 1..];
            }
        }
        target
    }

    /// Wire failures say nothing about whether the object exists.
    fn transport_error(context: &str, e: reqwest::Error) -> BackendError {
        BackendError::new(BackendErrorKind::Transient(format!("{}: {}", context, e)))
    }

    fn status_error(key: &str, status: StatusCode) -> BackendError {
        if status == StatusCode::NOT_FOUND {
            BackendError::new(BackendErrorKind::NotFound(key.to_string()))
        } else if status.is_server_error() {
            BackendError::new(BackendErrorKind::Transient(format!(
                "{}: server returned {}",
                key, status
            )))
        } else {
            BackendError::new(BackendErrorKind::Read(format!(
                "{}: server returned {}",
                key, status
            )))
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for RemoteStore {
    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> MediacatResult<Vec<ObjectEntry>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("prefix", prefix)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Self::transport_error("list", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(BackendErrorKind::List(format!(
                "prefix {}: server returned {}",
                prefix, status
            )))
            .into());
        }

        let listing: ListResponse = response
            .json()
            .await
            .map_err(|e| Self::transport_error("parse listing", e))?;

        tracing::debug!(prefix, count = listing.objects.len(), "Listed remote objects");
        Ok(listing
            .objects
            .into_iter()
            .map(|o| ObjectEntry {
                key: o.key,
                url: o.url,
                size: o.size,
                uploaded_at: o.uploaded_at,
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> MediacatResult<Vec<u8>> {
        let response = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Self::transport_error(key, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(key, status).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(key, e))?;

        tracing::debug!(key, size = bytes.len(), "Fetched remote object");
        Ok(bytes.to_vec())
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> MediacatResult<String> {
        let response = self
            .client
            .put(self.object_url(key))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Self::transport_error(key, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(BackendErrorKind::Write(format!(
                "{}: server returned {}",
                key, status
            )))
            .into());
        }

        let stored: PutResponse = response
            .json()
            .await
            .map_err(|e| Self::transport_error(key, e))?;

        tracing::info!(key, url = %stored.url, "Stored remote object");
        Ok(stored.url)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, target: &str) -> MediacatResult<()> {
        let key = self.key_from_target(target);

        let response = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Self::transport_error(key, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(key, status).into());
        }

        tracing::info!(key, "Deleted remote object");
        Ok(())
    }
}
