//! Tracked task management
//!
//! Fire-and-forget work is spawned through a [`LayerTaskManager`] so that a
//! shutdown can wait for in-flight tasks and cancel whatever outlives the
//! grace period instead of abandoning them.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::errors::{Error, Result};

/// Default maximum number of concurrently running tasks per layer
pub const DEFAULT_MAX_TASKS: usize = 1000;

/// Default grace period granted to in-flight tasks on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Decrements the active counter however the task ends (completion, cancel, panic, abort)
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Task manager for one layer of the application
pub struct LayerTaskManager {
    /// Unique task ID counter
    next_task_id: AtomicUsize,

    /// Tracks every spawned task so shutdown can await them
    tracker: TaskTracker,

    /// Cancellation token for forced shutdown
    cancel_token: CancellationToken,

    /// Number of tasks currently running
    active_count: Arc<AtomicUsize>,

    /// Tasks refused because of the limit or a closed manager
    rejected_count: AtomicU64,

    /// Tasks that ended in a panic
    panicked_count: Arc<AtomicU64>,

    /// Layer name for logging
    layer_name: String,

    /// Maximum tasks allowed at once
    max_tasks: usize,

    /// Grace period before in-flight tasks are cancelled
    shutdown_timeout: Duration,
}

impl LayerTaskManager {
    /// Create a new task manager for a layer
    pub fn new(layer_name: impl Into<String>) -> Self {
        Self::with_config(layer_name, DEFAULT_MAX_TASKS, DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Create with custom configuration
    pub fn with_config(
        layer_name: impl Into<String>,
        max_tasks: usize,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            next_task_id: AtomicUsize::new(0),
            tracker: TaskTracker::new(),
            cancel_token: CancellationToken::new(),
            active_count: Arc::new(AtomicUsize::new(0)),
            rejected_count: AtomicU64::new(0),
            panicked_count: Arc::new(AtomicU64::new(0)),
            layer_name: layer_name.into(),
            max_tasks,
            shutdown_timeout,
        }
    }

    /// Spawn a tracked task on the current tokio runtime.
    ///
    /// Does not wait for the task. Fails when no runtime is available, the
    /// manager has been shut down, or `max_tasks` tasks are already running.
    pub fn spawn_tracked<F>(&self, name: impl Into<String>, future: F) -> Result<usize>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task_name = name.into();

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::NoRuntime(e.to_string()))?;

        if self.tracker.is_closed() || self.cancel_token.is_cancelled() {
            self.rejected_count.fetch_add(1, Ordering::Relaxed);
            return Err(Error::task_rejected(&self.layer_name, "layer is shutting down"));
        }

        let active = self.active_count.fetch_add(1, Ordering::AcqRel);
        if active >= self.max_tasks {
            self.active_count.fetch_sub(1, Ordering::AcqRel);
            self.rejected_count.fetch_add(1, Ordering::Relaxed);
            return Err(Error::task_rejected(
                &self.layer_name,
                format!("task limit reached ({} active)", active),
            ));
        }

        Ok(self.launch_reserved(&handle, task_name, future))
    }

    /// Spawn onto the tracker once an active slot has been reserved.
    ///
    /// Cancellation is polled first, so a task launched after `shutdown_all`
    /// tripped the token ends without ever polling `future`.
    fn launch_reserved<F>(&self, handle: &tokio::runtime::Handle, task_name: String, future: F) -> usize
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let guard = ActiveGuard(Arc::clone(&self.active_count));
        let cancel_token = self.cancel_token.clone();
        let panicked = Arc::clone(&self.panicked_count);
        let layer_name = self.layer_name.clone();

        let wrapped = async move {
            let _guard = guard;
            let started = Instant::now();
            debug!("Task started: {} [{}] in layer {}", task_name, task_id, layer_name);

            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    warn!(
                        "Task cancelled: {} [{}] in layer {} after {:?}",
                        task_name, task_id, layer_name, started.elapsed()
                    );
                }
                outcome = AssertUnwindSafe(future).catch_unwind() => {
                    if outcome.is_err() {
                        panicked.fetch_add(1, Ordering::Relaxed);
                        error!(
                            "💥 Task panicked: {} [{}] in layer {}",
                            task_name, task_id, layer_name
                        );
                    } else {
                        debug!(
                            "Task completed: {} [{}] in layer {} after {:?}",
                            task_name, task_id, layer_name, started.elapsed()
                        );
                    }
                }
            }
        };

        self.tracker.spawn_on(wrapped, handle);
        task_id
    }

    /// Get number of active tasks
    pub fn active_task_count(&self) -> usize {
        self.active_count.load(Ordering::Acquire)
    }

    /// Whether shutdown has begun
    pub fn is_shut_down(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Cancel all running tasks immediately
    pub fn cancel_all(&self) {
        debug!("Cancelling all tasks in layer {}", self.layer_name);
        self.cancel_token.cancel();
    }

    /// Stop accepting tasks, wait for in-flight ones up to the shutdown
    /// timeout, then cancel the remainder.
    ///
    /// No task body is polled after this returns.
    pub async fn shutdown_all(&self) -> Result<()> {
        let start = Instant::now();
        self.tracker.close();

        debug!(
            "Starting shutdown for layer {} with {} active tasks",
            self.layer_name,
            self.active_task_count()
        );

        match tokio::time::timeout(self.shutdown_timeout, self.tracker.wait()).await {
            Ok(()) => {
                debug!(
                    "Layer {} shutdown completed gracefully in {:?}",
                    self.layer_name,
                    start.elapsed()
                );
            }
            Err(_) => {
                warn!(
                    "Layer {} shutdown timed out after {:?}, cancelling {} tasks",
                    self.layer_name,
                    self.shutdown_timeout,
                    self.active_task_count()
                );
                self.cancel_all();
                self.tracker.wait().await;
            }
        }

        // Anything that slipped past the closed check is cancelled and awaited
        self.cancel_token.cancel();
        self.tracker.wait().await;

        Ok(())
    }

    /// Get task statistics
    pub fn stats(&self) -> TaskStats {
        TaskStats {
            layer_name: self.layer_name.clone(),
            spawned_tasks: self.next_task_id.load(Ordering::Relaxed),
            active_tasks: self.active_task_count(),
            rejected_tasks: self.rejected_count.load(Ordering::Relaxed),
            panicked_tasks: self.panicked_count.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for LayerTaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerTaskManager")
            .field("layer_name", &self.layer_name)
            .field("active", &self.active_task_count())
            .field("max_tasks", &self.max_tasks)
            .field("closed", &self.tracker.is_closed())
            .finish()
    }
}

/// Task statistics
#[derive(Debug, Clone)]
pub struct TaskStats {
    pub layer_name: String,
    pub spawned_tasks: usize,
    pub active_tasks: usize,
    pub rejected_tasks: u64,
    pub panicked_tasks: u64,
}
