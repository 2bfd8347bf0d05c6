//! Media kind classification.

use serde::{Deserialize, Serialize};

/// Kind of media content, derived from content type at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Image content (PNG, JPEG, WebP, etc.)
    Image,
    /// Video content (MP4, WebM, MOV, etc.)
    Video,
    /// Anything else (PDF, ZIP, plain files)
    File,
}

impl MediaKind {
    /// Classify from a MIME content type.
    pub fn from_content_type(content_type: &str) -> Self {
        let main = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if main.starts_with("image/") {
            MediaKind::Image
        } else if main.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::File
        }
    }

    /// Classify from a file extension, for assets synthesized from a bare
    /// backend key where no content type is available.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "avif" | "bmp" | "ico" => {
                MediaKind::Image
            }
            "mp4" | "webm" | "mov" | "mkv" | "avi" | "m4v" => MediaKind::Video,
            _ => MediaKind::File,
        }
    }

    /// Convert to string representation for the registry document.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::File => "file",
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "file" => Ok(MediaKind::File),
            _ => Err(format!("Unknown media kind: {}", s)),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_content_type() {
        assert_eq!(MediaKind::from_content_type("image/png"), MediaKind::Image);
        assert_eq!(
            MediaKind::from_content_type("video/mp4; codecs=avc1"),
            MediaKind::Video
        );
        assert_eq!(
            MediaKind::from_content_type("application/pdf"),
            MediaKind::File
        );
        assert_eq!(MediaKind::from_content_type(""), MediaKind::File);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(MediaKind::from_extension("PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("zip"), MediaKind::File);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&MediaKind::Image).unwrap();
        assert_eq!(json, "\"image\"");
        let kind: MediaKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(kind, MediaKind::Video);
    }
}
