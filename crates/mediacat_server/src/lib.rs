//! HTTP interface for the mediacat media registry.
//!
//! Exposes the lifecycle API, the maintenance passes, and a server-sent
//! event stream of registry mutations over a small axum router. All
//! handlers are thin translations between HTTP and the registry crate;
//! no registry logic lives here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod server;

pub use config::ServerConfig;
pub use server::{AppState, create_router, serve};
