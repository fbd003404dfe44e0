//! Offline cache reconciliation for a web application shell.
//!
//! [`CacheReconciler`] owns three named cache stores and reacts to the
//! install, activate, fetch and message events of a service worker. It talks
//! to its host only through the traits in [`platform`], so the same logic runs
//! in the browser (see the `service-worker` crate) and against
//! [`memory::MemoryPlatform`] in tests.

pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod platform;
mod reconciler;

pub use config::ReconcilerConfig;
pub use error::{ErrorContext, ReconcilerError, Result, ResultContext};
pub use platform::{
    Cache, CacheStorage, FetchMode, Host, HostRequest, HostResponse, Lifecycle, Network, Platform,
};
pub use reconciler::*;
