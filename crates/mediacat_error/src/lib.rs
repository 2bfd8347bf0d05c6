//! Error types for the mediacat media registry.
//!
//! This crate provides the foundation error types used throughout the
//! mediacat workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! The kind split matters operationally: `BackendErrorKind::NotFound` and
//! `BackendErrorKind::Transient` are distinct variants because reconciliation
//! treats a definitive 404 (backing bytes are gone) very differently from a
//! network hiccup (leave the entry alone).
//!
//! # Examples
//!
//! ```
//! use mediacat_error::{MediacatResult, ConfigError};
//!
//! fn load_setting() -> MediacatResult<String> {
//!     Err(ConfigError::new("MEDIACAT_BACKEND not set"))?
//! }
//!
//! match load_setting() {
//!     Ok(value) => println!("Got: {}", value),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod registry;
mod server;

pub use backend::{BackendError, BackendErrorKind};
pub use config::ConfigError;
pub use error::{MediacatError, MediacatErrorKind, MediacatResult};
pub use registry::{RegistryError, RegistryErrorKind};
pub use server::{ServerError, ServerErrorKind};
