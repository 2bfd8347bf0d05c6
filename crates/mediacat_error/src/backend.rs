//! Storage backend error types.

/// Kinds of storage backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum BackendErrorKind {
    /// Object not found at the given key or URL. An expected outcome when
    /// probing possibly-stale references, never a fault.
    #[display("Object not found: {}", _0)]
    NotFound(String),
    /// Transient I/O failure (network hiccup, 5xx). Must not be treated as
    /// authoritative absence.
    #[display("Transient backend failure: {}", _0)]
    Transient(String),
    /// Failed to read an object
    #[display("Failed to read object: {}", _0)]
    Read(String),
    /// Failed to write an object
    #[display("Failed to write object: {}", _0)]
    Write(String),
    /// Failed to list objects under a prefix
    #[display("Failed to list objects: {}", _0)]
    List(String),
    /// Key or URL rejected by the backend
    #[display("Invalid storage key: {}", _0)]
    InvalidKey(String),
    /// Failed to create a storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
}

/// Backend error with location tracking.
///
/// # Examples
///
/// ```
/// use mediacat_error::{BackendError, BackendErrorKind};
///
/// let err = BackendError::new(BackendErrorKind::NotFound("media/123_a.png".to_string()));
/// assert!(err.is_not_found());
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Backend Error: {} at line {} in {}", kind, line, file)]
pub struct BackendError {
    /// The kind of error that occurred
    pub kind: BackendErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl BackendError {
    /// Create a new backend error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: BackendErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error is a definitive not-found outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, BackendErrorKind::NotFound(_))
    }

    /// Whether this error is a transient failure that says nothing about
    /// whether the object exists.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, BackendErrorKind::Transient(_))
    }
}
