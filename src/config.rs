//! Configuration
//!
//! Layered with the `config` crate, lowest precedence first: built-in
//! defaults, the global file (`<config dir>/vcs-status-cache/config.toml`), an
//! explicit file, then `VCS_STATUS__*` environment variables (`__` separates
//! nested keys, e.g. `VCS_STATUS__CACHE__MAX_CACHE_SIZE=5000`).

use crate::logging::LoggingConfig;
use crate::store::DEFAULT_MAX_CACHE_SIZE;
use crate::error::CacheError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCacheConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cache and worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry count above which old generations are evicted
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Name given to the worker thread
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,
}

fn default_max_cache_size() -> usize {
    DEFAULT_MAX_CACHE_SIZE
}

fn default_worker_thread_name() -> String {
    "status-cache-worker".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: default_max_cache_size(),
            worker_thread_name: default_worker_thread_name(),
        }
    }
}

/// Backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Program invoked by the git backend
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

fn default_git_binary() -> String {
    "git".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
        }
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Global config file location, if the platform has a config directory
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "vcs-status-cache", "vcs-status-cache")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from every layer
    pub fn load(explicit: Option<&Path>) -> Result<StatusCacheConfig, CacheError> {
        let mut builder = Config::builder();

        if let Some(global) = Self::global_config_path() {
            builder = builder.add_source(File::from(global).required(false));
        }
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix("VCS_STATUS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(CacheError::from)
    }

    /// Load a single file, without the global file or environment
    pub fn load_from_file(path: &Path) -> Result<StatusCacheConfig, CacheError> {
        Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
            .map_err(CacheError::from)
    }
}
