//! Top-level error wrapper types.

use crate::{BackendError, ConfigError, RegistryError, ServerError};

/// The foundation error enum for the mediacat workspace.
///
/// # Examples
///
/// ```
/// use mediacat_error::{MediacatError, ConfigError};
///
/// let cfg_err = ConfigError::new("Missing media root");
/// let err: MediacatError = cfg_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MediacatErrorKind {
    /// Storage backend error
    #[from(BackendError)]
    Backend(BackendError),
    /// Registry document error
    #[from(RegistryError)]
    Registry(RegistryError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// HTTP server error
    #[from(ServerError)]
    Server(ServerError),
}

/// Mediacat error with kind discrimination.
///
/// # Examples
///
/// ```
/// use mediacat_error::{MediacatResult, BackendError, BackendErrorKind};
///
/// fn probe() -> MediacatResult<Vec<u8>> {
///     Err(BackendError::new(BackendErrorKind::NotFound("media/x".into())))?
/// }
///
/// match probe() {
///     Ok(_) => println!("present"),
///     Err(e) => println!("absent: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Mediacat Error: {}", _0)]
pub struct MediacatError(Box<MediacatErrorKind>);

impl MediacatError {
    /// Create a new error from a kind.
    pub fn new(kind: MediacatErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MediacatErrorKind {
        &self.0
    }

    /// The backend error inside this error, if that is what it wraps.
    pub fn as_backend(&self) -> Option<&BackendError> {
        match self.kind() {
            MediacatErrorKind::Backend(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this error wraps a definitive backend not-found.
    pub fn is_not_found(&self) -> bool {
        self.as_backend().is_some_and(|e| e.is_not_found())
    }

    /// Whether this error wraps a transient backend failure.
    pub fn is_transient(&self) -> bool {
        self.as_backend().is_some_and(|e| e.is_transient())
    }
}

// Generic From implementation for any type that converts to MediacatErrorKind
impl<T> From<T> for MediacatError
where
    T: Into<MediacatErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for mediacat operations.
///
/// # Examples
///
/// ```
/// use mediacat_error::{MediacatResult, ConfigError};
///
/// fn load() -> MediacatResult<()> {
///     Err(ConfigError::new("bad value"))?
/// }
/// ```
pub type MediacatResult<T> = std::result::Result<T, MediacatError>;
