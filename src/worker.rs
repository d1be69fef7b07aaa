//! Status Worker
//!
//! Single long-lived background thread that drains the request queue. Each
//! request is answered from the store when a concurrent request already
//! populated it, otherwise from the backend; results are written back before
//! the callback runs and the one-shot answer is sent.

use crate::aggregate::make_summary;
use crate::backend::StatusBackend;
use crate::queue::{PendingRequest, QueueCounters, QueueReceiver, WorkerMessage};
use crate::status::StatusValue;
use crate::store::StatusTreeStore;
use crate::types::{CheckOptions, StatusMap, StatusResult};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Background consumer of the request queue
pub(crate) struct StatusWorker {
    store: Arc<StatusTreeStore>,
    backend: Arc<dyn StatusBackend>,
    counters: Arc<QueueCounters>,
    running: Arc<RwLock<bool>>,
}

impl StatusWorker {
    pub(crate) fn new(
        store: Arc<StatusTreeStore>,
        backend: Arc<dyn StatusBackend>,
        counters: Arc<QueueCounters>,
        running: Arc<RwLock<bool>>,
    ) -> Self {
        Self {
            store,
            backend,
            counters,
            running,
        }
    }

    /// Run the worker loop on a dedicated named thread
    pub(crate) fn spawn(
        self,
        receiver: QueueReceiver,
        thread_name: &str,
    ) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || self.run(receiver))
    }

    fn run(self, mut receiver: QueueReceiver) {
        info!(backend = self.backend.name(), "Status worker started");

        while *self.running.read() {
            match receiver.blocking_next() {
                Some(WorkerMessage::Check(request)) => self.process(request),
                // Loop condition re-checks the stop flag.
                Some(WorkerMessage::Shutdown) => continue,
                None => break,
            }
        }

        let dropped = receiver.close();
        if dropped > 0 {
            warn!(dropped, "Dropped unprocessed status requests at shutdown");
        }
        info!("Status worker stopped");
    }

    fn process(&self, request: PendingRequest) {
        let PendingRequest {
            path,
            options,
            callback,
            responder,
        } = request;

        let result = self.resolve(&path, options);

        if let Some(callback) = callback {
            if catch_unwind(AssertUnwindSafe(|| callback(&path, &result))).is_err() {
                self.counters.callback_panics.fetch_add(1, Ordering::Relaxed);
                error!(path = %path.display(), "Status callback panicked");
            }
        }

        // The caller may have dropped its handle; the callback already ran.
        let _ = responder.send(result);
    }

    fn resolve(&self, path: &Path, options: CheckOptions) -> StatusResult {
        // Invalidated subtrees may hold entries for renamed or deleted paths.
        let cached = if options.invalidate {
            None
        } else {
            self.store.get(path, options.recurse)
        };

        let statuses = match cached {
            Some(statuses) => {
                self.counters
                    .served_from_cache
                    .fetch_add(1, Ordering::Relaxed);
                debug!(path = %path.display(), "Request already satisfied by cache");
                statuses
            }
            None => self.compute(path, options),
        };

        if options.summary {
            make_summary(path, &statuses, self.backend.is_directory(path))
        } else {
            StatusResult::Statuses(statuses)
        }
    }

    fn compute(&self, path: &Path, options: CheckOptions) -> StatusMap {
        self.counters.backend_calls.fetch_add(1, Ordering::Relaxed);

        let mut records = match self.backend.check(path, options.recurse) {
            Ok(records) => {
                debug!(
                    path = %path.display(),
                    records = records.len(),
                    recurse = options.recurse,
                    "Backend status check completed"
                );
                records
            }
            Err(err) => {
                self.counters
                    .backend_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!(path = %path.display(), error = %err, "Backend status check failed");
                vec![(path.to_path_buf(), StatusValue::Error)]
            }
        };

        if !records.iter().any(|(other, _)| other == path) {
            warn!(path = %path.display(), "Backend returned no status for requested path");
            records.push((path.to_path_buf(), StatusValue::Unknown));
        }

        let stored = if options.invalidate {
            self.store.replace_subtree(path, records, options.recurse)
        } else {
            self.store.add_batch_and_get(path, records, options.recurse)
        };

        stored.unwrap_or_else(|| {
            let mut statuses = StatusMap::new();
            statuses.insert(path.to_path_buf(), StatusValue::Unknown);
            statuses
        })
    }
}
