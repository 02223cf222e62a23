//! Task runner abstraction
//!
//! Workflows run off the caller's context, and the progress flush runs as a
//! periodic task next to them. [`TaskRunner`] is the seam; [`TokioTaskRunner`]
//! implements it on a tokio runtime.

use crate::core::error::{SoakError, SoakResult};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Runs workflow bodies and periodic callbacks
pub trait TaskRunner: Send + Sync {
    /// Run `task` without blocking the caller
    fn run_async(&self, task: BoxFuture<'static, ()>) -> TaskHandle;

    /// Call `callback` every `interval` until the returned handle is cancelled
    ///
    /// The first call happens one full interval after scheduling.
    fn run_periodic(&self, interval: Duration, callback: Box<dyn FnMut() + Send>)
    -> PeriodicHandle;
}

/// Handle to a task started with [`TaskRunner::run_async`]
#[derive(Debug)]
pub struct TaskHandle {
    inner: JoinHandle<()>,
}

impl TaskHandle {
    /// Wrap a tokio join handle
    pub fn new(inner: JoinHandle<()>) -> Self {
        Self { inner }
    }

    /// Wait for the task to finish
    pub async fn join(self) -> SoakResult<()> {
        self.inner
            .await
            .map_err(|e| SoakError::internal(format!("workflow task failed: {e}")))
    }

    /// Whether the task has finished
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// Handle to a periodic task; cancelling or dropping it stops the task
#[derive(Debug)]
pub struct PeriodicHandle {
    inner: Option<JoinHandle<()>>,
}

impl PeriodicHandle {
    /// Wrap a tokio join handle
    pub fn new(inner: JoinHandle<()>) -> Self {
        Self { inner: Some(inner) }
    }

    /// Stop calling the callback
    pub fn cancel(&self) {
        if let Some(inner) = &self.inner {
            inner.abort();
        }
    }

    /// Stop the task and wait until it can no longer run the callback
    pub async fn stop(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.abort();
            // Cancellation is the expected outcome
            let _ = inner.await;
        }
    }

    /// Whether the periodic task has stopped
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for PeriodicHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// [`TaskRunner`] spawning onto a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioTaskRunner {
    handle: Handle,
}

impl TokioTaskRunner {
    /// Runner for the runtime the caller is executing on
    pub fn current() -> SoakResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| SoakError::internal(format!("no tokio runtime available: {e}")))?;
        Ok(Self { handle })
    }
}

impl TaskRunner for TokioTaskRunner {
    fn run_async(&self, task: BoxFuture<'static, ()>) -> TaskHandle {
        TaskHandle::new(self.handle.spawn(task))
    }

    fn run_periodic(
        &self,
        interval: Duration,
        mut callback: Box<dyn FnMut() + Send>,
    ) -> PeriodicHandle {
        let inner = self.handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                callback();
            }
        });
        debug!("Started periodic task every {:?}", interval);
        PeriodicHandle::new(inner)
    }
}
