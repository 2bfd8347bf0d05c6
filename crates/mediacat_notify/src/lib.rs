//! Change-notification fan-out for the mediacat media registry.
//!
//! This crate provides the in-process publish/subscribe hub that pushes
//! registry mutations to long-lived observers (SSE connections and the
//! like) without polling.
//!
//! The hub is an explicitly owned object created at process start and
//! injected where needed, not a singleton. Publishing never fails: a
//! channel whose observer went away is pruned opportunistically instead of
//! surfacing an error to the mutation path.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod hub;

pub use event::ChangeEvent;
pub use hub::{ChangeHub, Subscription};
