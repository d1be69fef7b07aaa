//! VCS Status Cache: Non-blocking Working Copy Status
//!
//! A concurrent cache of per-file version-control status for UI consumers.
//! Queries never block on the version-control tool: they answer from a
//! hierarchical cache or return a `calculating` placeholder while a single
//! background worker runs the backend and delivers the real answer through a
//! callback. Directory summaries fold a subtree into one emblem-ready status.

pub mod aggregate;
pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod queue;
pub mod status;
pub mod store;
pub mod types;
mod worker;

pub use backend::{GitBackend, StaticBackend, StatusBackend};
pub use cache::{CacheStats, StatusCache, StatusResponse};
pub use error::{BackendError, CacheError};
pub use queue::{PendingStatus, StatusCallback};
pub use status::StatusValue;
pub use store::StatusTreeStore;
pub use types::{CheckOptions, StatusMap, StatusResult};
