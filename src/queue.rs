//! Request Queue
//!
//! Unbounded FIFO hand-off of pending status requests from any number of
//! caller threads to the single status worker. Each request carries a one-shot
//! responder so the eventual answer is delivered as a typed value, alongside
//! the optional caller callback.

use crate::error::CacheError;
use crate::types::{CheckOptions, StatusResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Callback invoked on the worker thread with the final answer
pub type StatusCallback = Box<dyn FnOnce(&Path, &StatusResult) + Send + 'static>;

/// Status request waiting for the worker
pub struct PendingRequest {
    pub path: PathBuf,
    pub options: CheckOptions,
    pub(crate) callback: Option<StatusCallback>,
    pub(crate) responder: oneshot::Sender<StatusResult>,
}

impl PendingRequest {
    /// Create a request and the handle its answer will arrive on
    pub fn new(
        path: PathBuf,
        options: CheckOptions,
        callback: Option<StatusCallback>,
    ) -> (Self, PendingStatus) {
        let (responder, receiver) = oneshot::channel();
        (
            Self {
                path,
                options,
                callback,
                responder,
            },
            PendingStatus { receiver },
        )
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Handle on the answer to a request that missed the cache
///
/// Resolves once the worker has processed the request. Resolves to
/// [`CacheError::WorkerStopped`] if the worker stops before answering.
#[derive(Debug)]
pub struct PendingStatus {
    receiver: oneshot::Receiver<StatusResult>,
}

impl PendingStatus {
    /// Wait for the answer from async code
    pub async fn wait(self) -> Result<StatusResult, CacheError> {
        self.receiver.await.map_err(|_| CacheError::WorkerStopped)
    }

    /// Wait for the answer from a plain thread
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_wait(self) -> Result<StatusResult, CacheError> {
        self.receiver
            .blocking_recv()
            .map_err(|_| CacheError::WorkerStopped)
    }

    /// Take the answer if it has already arrived
    pub fn try_take(&mut self) -> Result<Option<StatusResult>, CacheError> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(CacheError::WorkerStopped),
        }
    }
}

/// Message consumed by the worker loop
#[derive(Debug)]
pub(crate) enum WorkerMessage {
    Check(PendingRequest),
    /// Wakes an idle worker so it can observe the stop flag
    Shutdown,
}

/// Queue counters, updated by producers and the worker
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    pub(crate) enqueued: AtomicU64,
    pub(crate) dequeued: AtomicU64,
    pub(crate) served_from_cache: AtomicU64,
    pub(crate) backend_calls: AtomicU64,
    pub(crate) backend_failures: AtomicU64,
    pub(crate) callback_panics: AtomicU64,
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Requests waiting for the worker
    pub pending: u64,
    /// Requests ever enqueued
    pub enqueued: u64,
    /// Requests taken off the queue
    pub processed: u64,
    /// Requests answered by the worker's cache re-check
    pub served_from_cache: u64,
    /// Backend invocations
    pub backend_calls: u64,
    /// Backend invocations that failed
    pub backend_failures: u64,
    /// Callbacks that panicked
    pub callback_panics: u64,
}

impl QueueCounters {
    fn snapshot(&self) -> QueueStats {
        let enqueued = self.enqueued.load(Ordering::Relaxed);
        let processed = self.dequeued.load(Ordering::Relaxed);
        QueueStats {
            pending: enqueued.saturating_sub(processed),
            enqueued,
            processed,
            served_from_cache: self.served_from_cache.load(Ordering::Relaxed),
            backend_calls: self.backend_calls.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
        }
    }
}

/// Producer side of the request queue, shared by all callers
pub struct RequestQueue {
    sender: mpsc::UnboundedSender<WorkerMessage>,
    /// Consumer end, handed out once to the single worker
    receiver: Mutex<Option<mpsc::UnboundedReceiver<WorkerMessage>>>,
    counters: Arc<QueueCounters>,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            counters: Arc::new(QueueCounters::default()),
        }
    }

    /// Append a request; fails once the consumer is gone
    ///
    /// On failure the request is dropped, which resolves its pending handle
    /// to [`CacheError::WorkerStopped`].
    pub fn enqueue(&self, request: PendingRequest) -> Result<(), CacheError> {
        let path = request.path.clone();
        self.sender
            .send(WorkerMessage::Check(request))
            .map_err(|_| CacheError::WorkerStopped)?;
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        debug!(path = %path.display(), "Enqueued status request");
        Ok(())
    }

    /// Wake the worker so it can stop
    pub(crate) fn request_shutdown(&self) {
        // A closed channel means the worker is already gone.
        let _ = self.sender.send(WorkerMessage::Shutdown);
    }

    /// Take the consumer end; only the first caller gets it
    pub(crate) fn take_receiver(&self) -> Option<QueueReceiver> {
        self.receiver.lock().take().map(|receiver| QueueReceiver {
            receiver,
            counters: Arc::clone(&self.counters),
        })
    }

    pub(crate) fn counters(&self) -> Arc<QueueCounters> {
        Arc::clone(&self.counters)
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }
}

/// Consumer side of the request queue, owned by the worker thread
pub(crate) struct QueueReceiver {
    receiver: mpsc::UnboundedReceiver<WorkerMessage>,
    counters: Arc<QueueCounters>,
}

impl QueueReceiver {
    /// Block until the next message; `None` once every producer is gone
    pub(crate) fn blocking_next(&mut self) -> Option<WorkerMessage> {
        let message = self.receiver.blocking_recv()?;
        if matches!(message, WorkerMessage::Check(_)) {
            self.counters.dequeued.fetch_add(1, Ordering::Relaxed);
        }
        Some(message)
    }

    /// Stop accepting messages and drop everything still queued
    pub(crate) fn close(&mut self) -> usize {
        self.receiver.close();
        let mut dropped = 0;
        while let Ok(message) = self.receiver.try_recv() {
            if matches!(message, WorkerMessage::Check(_)) {
                dropped += 1;
            }
        }
        dropped
    }
}
