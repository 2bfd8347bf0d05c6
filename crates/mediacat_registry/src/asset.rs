//! The media asset data model.

use crate::ASSET_PREFIX;
use chrono::{DateTime, TimeZone, Utc};
use mediacat_storage::{MediaKind, ObjectEntry};
use serde::{Deserialize, Serialize};

/// One entry in the media registry.
///
/// Field names serialize in the registry document's camelCase wire form.
/// `url` is immutable once set; `id` is the correlation key for stale and
/// duplicate detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    /// Unique creation token (millisecond epoch), also the sort key
    pub id: String,
    /// Backend-relative storage key, `media/<id>_<sanitizedName>`
    pub name: String,
    /// Human-supplied filename at upload time
    pub original_name: String,
    /// Fully resolved fetch location
    pub url: String,
    /// Media kind derived from content type at creation
    pub kind: MediaKind,
    /// Display-only size text, never used for consistency decisions
    #[serde(default)]
    pub size_label: String,
    /// Display-only dimensions text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions_label: Option<String>,
    /// Creation timestamp, RFC 3339
    pub uploaded_at: String,
    /// Whether the lifecycle API may remove this entry. False for bundled
    /// assets that were never present in the backend.
    #[serde(default = "default_deletable")]
    pub deletable: bool,
}

fn default_deletable() -> bool {
    true
}

impl MediaAsset {
    /// Synthesize an asset from a bare backend listing entry (orphan
    /// adoption).
    ///
    /// Metadata is inferred from the object key: the leading numeric token
    /// of the file name becomes `id` and `uploadedAt`, the remainder after
    /// the first `_` becomes `originalName`, and the extension decides
    /// `kind`.
    pub fn from_listing(entry: &ObjectEntry) -> Self {
        let file_name = entry
            .key
            .strip_prefix(ASSET_PREFIX)
            .unwrap_or(&entry.key)
            .rsplit('/')
            .next()
            .unwrap_or_default();

        let (token, original_name) = match file_name.split_once('_') {
            Some((lead, rest)) if lead.chars().all(|c| c.is_ascii_digit()) && !lead.is_empty() => {
                (Some(lead), rest.to_string())
            }
            _ => (None, file_name.to_string()),
        };

        let uploaded_at = token
            .and_then(|t| t.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .or(entry.uploaded_at)
            .unwrap_or_else(Utc::now);

        let id = token
            .map(str::to_string)
            .unwrap_or_else(|| uploaded_at.timestamp_millis().to_string());

        let kind = file_name
            .rsplit_once('.')
            .map(|(_, ext)| MediaKind::from_extension(ext))
            .unwrap_or(MediaKind::File);

        MediaAsset {
            id,
            name: entry.key.clone(),
            original_name,
            url: entry.url.clone(),
            kind,
            size_label: entry.size.map(format_size_label).unwrap_or_default(),
            dimensions_label: None,
            uploaded_at: uploaded_at.to_rfc3339(),
            deletable: true,
        }
    }

    /// Numeric value of the id, for newest-first ordering.
    fn id_value(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}

/// The registry document: an ordered sequence of media assets persisted as
/// one JSON array under the well-known key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryDocument {
    /// The known assets
    pub assets: Vec<MediaAsset>,
}

impl RegistryDocument {
    /// An empty document, the state before any upload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assets in the document.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the document holds no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Append an asset.
    pub fn push(&mut self, asset: MediaAsset) {
        self.assets.push(asset);
    }

    /// Find an asset by id.
    pub fn find(&self, id: &str) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Remove the asset with the given id, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<MediaAsset> {
        let index = self.assets.iter().position(|a| a.id == id)?;
        Some(self.assets.remove(index))
    }

    /// Whether any asset references `url`.
    pub fn contains_url(&self, url: &str) -> bool {
        self.assets.iter().any(|a| a.url == url)
    }

    /// Sort assets newest-first by id in place. Non-numeric ids fall back
    /// to lexicographic order after all numeric ids.
    pub fn sort_newest_first(&mut self) {
        self.assets.sort_by(|a, b| match (a.id_value(), b.id_value()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.id.cmp(&a.id),
        });
    }
}

/// Allocate a monotonic creation token: milliseconds since the epoch,
/// bumped past the previous token when two allocations land in the same
/// millisecond.
pub fn creation_token() -> String {
    use std::sync::atomic::{AtomicI64, Ordering};
    static LAST: AtomicI64 = AtomicI64::new(0);

    let now = Utc::now().timestamp_millis();
    let token = LAST
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
            Some(now.max(last + 1))
        })
        .map(|last| now.max(last + 1))
        .unwrap_or(now);
    token.to_string()
}

/// Human-readable size text for display fields.
///
/// ```
/// use mediacat_registry::format_size_label;
///
/// assert_eq!(format_size_label(512), "512 B");
/// assert_eq!(format_size_label(2_621_440), "2.5 MB");
/// ```
pub fn format_size_label(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn asset(id: &str) -> MediaAsset {
        MediaAsset {
            id: id.to_string(),
            name: format!("media/{}_pic.png", id),
            original_name: "pic.png".to_string(),
            url: format!("http://localhost/files/media/{}_pic.png", id),
            kind: MediaKind::Image,
            size_label: "1.0 KB".to_string(),
            dimensions_label: None,
            uploaded_at: "2024-05-01T12:00:00+00:00".to_string(),
            deletable: true,
        }
    }

    #[test]
    fn test_camel_case_wire_format() {
        let value = serde_json::to_value(asset("1700000000000")).unwrap();
        assert_eq!(value["originalName"], "pic.png");
        assert_eq!(value["sizeLabel"], "1.0 KB");
        assert_eq!(value["uploadedAt"], "2024-05-01T12:00:00+00:00");
        assert_eq!(value["kind"], "image");
        assert!(value.get("dimensionsLabel").is_none());
    }

    #[test]
    fn test_document_is_a_bare_array() {
        let mut doc = RegistryDocument::new();
        doc.push(asset("1"));
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.starts_with('['));

        let parsed: RegistryDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_deletable_defaults_to_true() {
        let json = r#"[{"id":"1","name":"media/1_a.png","originalName":"a.png",
            "url":"http://x/a.png","kind":"image","uploadedAt":"2024-05-01T12:00:00Z"}]"#;
        let doc: RegistryDocument = serde_json::from_str(json).unwrap();
        assert!(doc.assets[0].deletable);
        assert_eq!(doc.assets[0].size_label, "");
    }

    #[test]
    fn test_sort_newest_first() {
        let mut doc = RegistryDocument::new();
        doc.push(asset("1700000000001"));
        doc.push(asset("1700000000009"));
        doc.push(asset("1700000000005"));
        doc.sort_newest_first();
        let ids: Vec<_> = doc.assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1700000000009", "1700000000005", "1700000000001"]);
    }

    #[test]
    fn test_from_listing_infers_metadata() {
        let entry = ObjectEntry {
            key: "media/1700000000000_holiday.webm".to_string(),
            url: "http://cdn/media/1700000000000_holiday.webm".to_string(),
            size: Some(2048),
            uploaded_at: None,
        };
        let asset = MediaAsset::from_listing(&entry);
        assert_eq!(asset.id, "1700000000000");
        assert_eq!(asset.original_name, "holiday.webm");
        assert_eq!(asset.kind, MediaKind::Video);
        assert_eq!(asset.size_label, "2.0 KB");
        assert!(asset.deletable);
        assert!(asset.uploaded_at.starts_with("2023-11-14T22:13:20"));
    }

    #[test]
    fn test_creation_tokens_are_unique_and_increasing() {
        let tokens: Vec<i64> = (0..100)
            .map(|_| creation_token().parse().unwrap())
            .collect();
        for pair in tokens.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_from_listing_without_token() {
        let entry = ObjectEntry {
            key: "media/readme.txt".to_string(),
            url: "http://cdn/media/readme.txt".to_string(),
            size: None,
            uploaded_at: None,
        };
        let asset = MediaAsset::from_listing(&entry);
        assert_eq!(asset.original_name, "readme.txt");
        assert_eq!(asset.kind, MediaKind::File);
        assert!(!asset.id.is_empty());
    }
}
