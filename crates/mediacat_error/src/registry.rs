//! Registry document error types.

/// Kinds of registry document errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RegistryErrorKind {
    /// Registry document exists but does not parse as a media registry
    #[display("Malformed registry document: {}", _0)]
    Malformed(String),
    /// Failed to serialize the registry document
    #[display("Failed to serialize registry document: {}", _0)]
    Serialize(String),
    /// Asset metadata rejected by the lifecycle API
    #[display("Invalid asset: {}", _0)]
    InvalidAsset(String),
}

/// Registry error with location tracking.
///
/// # Examples
///
/// ```
/// use mediacat_error::{RegistryError, RegistryErrorKind};
///
/// let err = RegistryError::new(RegistryErrorKind::Malformed("not json".to_string()));
/// assert!(format!("{}", err).contains("Malformed"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Registry Error: {} at line {} in {}", kind, line, file)]
pub struct RegistryError {
    /// The kind of error that occurred
    pub kind: RegistryErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RegistryError {
    /// Create a new registry error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RegistryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
