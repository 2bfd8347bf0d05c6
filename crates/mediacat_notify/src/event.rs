//! Registry mutation events.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// An event fanned out to registry observers.
///
/// Serializes with a lowercase `type` discriminator, matching the wire
/// format of the event stream:
///
/// ```
/// use mediacat_notify::ChangeEvent;
///
/// let json = serde_json::to_string(&ChangeEvent::Ping).unwrap();
/// assert_eq!(json, r#"{"type":"ping"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeEvent {
    /// Connection confirmation, enqueued immediately on subscribe
    Connected,
    /// Periodic keepalive
    Ping,
    /// A new asset entered the registry
    Upload {
        /// The created asset, serialized in registry-document form
        file: JsonValue,
    },
    /// Assets were removed through the lifecycle API
    Delete {
        /// Ids that were deleted
        #[serde(rename = "deletedFiles")]
        deleted_files: Vec<String>,
        /// Per-id failures, empty when the whole batch succeeded
        errors: Vec<String>,
    },
    /// A maintenance pass altered the registry
    Update {
        /// Asset count before the pass
        #[serde(rename = "totalBefore")]
        total_before: usize,
        /// Asset count after the pass
        #[serde(rename = "totalAfter")]
        total_after: usize,
        /// Ids removed by the pass
        removed: Vec<String>,
    },
}
