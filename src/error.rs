//! Error types for the status cache.
//!
//! Backend failures never reach `check_status` callers as errors: the worker
//! converts them into an `error` status for the affected path. Cache errors
//! surface through the pending response handle, store lookups, worker start-up
//! and configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a status backend for one status determination
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// External VCS command exited unsuccessfully
    #[error("Command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// I/O failure while running or reading from the backend
    #[error("I/O error: {0}")]
    Io(String),

    /// Path is not inside a working copy known to this backend
    #[error("Path is not versioned: {0}")]
    NotVersioned(PathBuf),

    /// Backend output could not be interpreted
    #[error("Unparseable backend output: {0}")]
    Parse(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

/// Errors raised by the cache subsystem
#[derive(Error, Debug)]
pub enum CacheError {
    /// No cache entry exists for the path (distinct from an empty subtree)
    #[error("No cached status for path: {0}")]
    NotFound(PathBuf),

    /// Path is not inside any recognized working copy
    #[error("Path is not inside a working copy: {0}")]
    Unclassified(PathBuf),

    /// Background worker is not running, the request will never be answered
    #[error("Status worker has stopped")]
    WorkerStopped,

    /// Background worker thread could not be spawned
    #[error("Failed to spawn status worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for CacheError {
    fn from(err: config::ConfigError) -> Self {
        CacheError::Config(err.to_string())
    }
}
