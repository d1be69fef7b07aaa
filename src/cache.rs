//! Cache Facade
//!
//! Synchronous entry point used by UI code. A status query either returns
//! straight from the cache or returns a `calculating` placeholder and queues a
//! background check whose answer arrives through the callback and the
//! response's [`PendingStatus`] handle. The two values can differ; callers
//! update their view when the second one arrives.

use crate::aggregate::make_summary;
use crate::backend::StatusBackend;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::queue::{PendingRequest, PendingStatus, QueueStats, RequestQueue, StatusCallback};
use crate::status::StatusValue;
use crate::store::{StatusTreeStore, StoreStats};
use crate::types::{CheckOptions, StatusMap, StatusResult};
use crate::worker::StatusWorker;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Two-phase answer of [`StatusCache::check_status`]
#[derive(Debug)]
pub struct StatusResponse {
    /// Value available now: cached data, `unknown`, or the `calculating` placeholder
    pub immediate: StatusResult,
    /// Handle on the background answer; `None` when `immediate` is final
    pub pending: Option<PendingStatus>,
}

impl StatusResponse {
    fn ready(immediate: StatusResult) -> Self {
        Self {
            immediate,
            pending: None,
        }
    }

    /// Whether the immediate value is already final
    pub fn is_ready(&self) -> bool {
        self.pending.is_none()
    }

    /// Final value, waiting for the worker if needed (async callers)
    pub async fn resolve(self) -> Result<StatusResult, CacheError> {
        match self.pending {
            Some(pending) => pending.wait().await,
            None => Ok(self.immediate),
        }
    }

    /// Final value, blocking the current thread if needed
    pub fn resolve_blocking(self) -> Result<StatusResult, CacheError> {
        match self.pending {
            Some(pending) => pending.blocking_wait(),
            None => Ok(self.immediate),
        }
    }
}

/// Cache occupancy and worker counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: String,
    pub running: bool,
    pub store: StoreStats,
    pub queue: QueueStats,
}

/// Status cache with one background worker
pub struct StatusCache {
    store: Arc<StatusTreeStore>,
    queue: Arc<RequestQueue>,
    backend: Arc<dyn StatusBackend>,
    config: CacheConfig,
    running: Arc<RwLock<bool>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StatusCache {
    /// Create a stopped cache; call [`StatusCache::start`] to begin serving
    ///
    /// Requests made before `start` are queued and answered once it runs.
    pub fn new(backend: Arc<dyn StatusBackend>, config: CacheConfig) -> Self {
        Self {
            store: Arc::new(StatusTreeStore::new(config.max_cache_size)),
            queue: Arc::new(RequestQueue::new()),
            backend,
            config,
            running: Arc::new(RwLock::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Create and start a cache
    pub fn spawn(backend: Arc<dyn StatusBackend>, config: CacheConfig) -> Result<Self, CacheError> {
        let cache = Self::new(backend, config);
        cache.start()?;
        Ok(cache)
    }

    /// Start the background worker
    ///
    /// Idempotent while running. A cache that has been shut down cannot be
    /// restarted.
    pub fn start(&self) -> Result<(), CacheError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let receiver = self.queue.take_receiver().ok_or(CacheError::WorkerStopped)?;
        *self.running.write() = true;

        let status_worker = StatusWorker::new(
            Arc::clone(&self.store),
            Arc::clone(&self.backend),
            self.queue.counters(),
            Arc::clone(&self.running),
        );
        let handle = status_worker
            .spawn(receiver, &self.config.worker_thread_name)
            .map_err(|e| {
                *self.running.write() = false;
                CacheError::WorkerSpawn(e)
            })?;
        *worker = Some(handle);

        info!(
            backend = self.backend.name(),
            max_cache_size = self.config.max_cache_size,
            "Started status cache"
        );
        Ok(())
    }

    /// Stop the worker and wait for it to exit
    ///
    /// An in-flight backend call finishes first. Requests still queued are
    /// dropped and their pending handles resolve to
    /// [`CacheError::WorkerStopped`].
    pub fn shutdown(&self) {
        let handle = self.worker.lock().take();
        let Some(handle) = handle else {
            return;
        };

        *self.running.write() = false;
        self.queue.request_shutdown();

        // A callback holding the last reference drops the cache on the worker
        // thread itself; the loop exits on its own once the callback returns.
        if handle.thread().id() == thread::current().id() {
            debug!("Shutdown requested from the worker thread");
            return;
        }

        if handle.join().is_err() {
            error!("Status worker panicked");
        }
        info!("Stopped status cache");
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Query the status of `path`
    ///
    /// Never blocks on the backend and never fails. Paths outside any working
    /// copy answer `unknown` without queueing. Cached paths answer from the
    /// store unless `invalidate` is set. Everything else answers `calculating`
    /// and queues a background check; its result is passed to `callback` on
    /// the worker thread and to the returned pending handle.
    pub fn check_status(
        &self,
        path: impl AsRef<Path>,
        options: CheckOptions,
        callback: Option<StatusCallback>,
    ) -> StatusResponse {
        let path = path.as_ref();

        if !self.backend.is_versioned(path) {
            debug!(path = %path.display(), "Path outside working copy");
            return StatusResponse::ready(self.wrap(
                path,
                single(path, StatusValue::Unknown),
                options,
            ));
        }

        if !options.invalidate {
            if let Some(statuses) = self.store.get(path, options.recurse) {
                return StatusResponse::ready(self.wrap(path, statuses, options));
            }
        }

        let (request, pending) = PendingRequest::new(path.to_path_buf(), options, callback);
        if let Err(err) = self.queue.enqueue(request) {
            warn!(path = %path.display(), error = %err, "Could not queue status request");
        }

        StatusResponse {
            immediate: self.wrap(path, single(path, StatusValue::Calculating), options),
            pending: Some(pending),
        }
    }

    /// Tell the cache that `path` changed outside of its knowledge
    ///
    /// Equivalent to an invalidating `check_status` whose answer is discarded.
    pub fn path_modified(&self, path: impl AsRef<Path>) {
        let _ = self.check_status(path, CheckOptions::new().invalidate(true), None);
    }

    /// Cached statuses for `path` without queueing anything
    pub fn cached(&self, path: impl AsRef<Path>, recurse: bool) -> Result<StatusMap, CacheError> {
        let path = path.as_ref();
        if !self.backend.is_versioned(path) {
            return Err(CacheError::Unclassified(path.to_path_buf()));
        }
        self.store
            .get(path, recurse)
            .ok_or_else(|| CacheError::NotFound(path.to_path_buf()))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            backend: self.backend.name().to_string(),
            running: self.is_running(),
            store: self.store.stats(),
            queue: self.queue.stats(),
        }
    }

    fn wrap(&self, path: &Path, statuses: StatusMap, options: CheckOptions) -> StatusResult {
        if options.summary {
            make_summary(path, &statuses, self.backend.is_directory(path))
        } else {
            StatusResult::Statuses(statuses)
        }
    }
}

impl Drop for StatusCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn single(path: &Path, status: StatusValue) -> StatusMap {
    let mut statuses = StatusMap::new();
    statuses.insert(path.to_path_buf(), status);
    statuses
}
