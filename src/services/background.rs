// src/services/background.rs
// DOCUMENTATION: Tracked fire-and-forget background work
// PURPOSE: Let shutdown wait for in-flight tasks such as outbound mail

use crate::errors::{BackgroundTaskError, ShutdownTimeout};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;

struct Inner {
    outstanding: AtomicUsize,
    drained: Notify,
    runtime: Handle,
}

/// Counter + barrier for background tasks
/// DOCUMENTATION: Cheap to clone; every clone shares the same counter.
/// Work is spawned onto the runtime captured at construction so that tasks
/// submitted from request handlers outlive the request's worker.
#[derive(Clone)]
pub struct TaskTracker {
    inner: Arc<Inner>,
}

/// Decrements the outstanding count exactly once, on every exit path
struct CompletionGuard {
    inner: Arc<Inner>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

impl TaskTracker {
    pub fn new(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                outstanding: AtomicUsize::new(0),
                drained: Notify::new(),
                runtime,
            }),
        }
    }

    /// Number of tasks spawned and not yet finished
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Run `work` asynchronously and track it until it finishes
    /// DOCUMENTATION: Errors and panics inside `work` are logged here and
    /// never reach the caller.
    pub fn spawn<F>(&self, name: &'static str, work: F)
    where
        F: Future<Output = Result<(), BackgroundTaskError>> + Send + 'static,
    {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        let guard = CompletionGuard {
            inner: self.inner.clone(),
        };

        self.inner.runtime.spawn(async move {
            let _guard = guard;

            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(BackgroundTaskError::Panicked(panic_message(payload))),
            };

            match result {
                Ok(()) => log::debug!("Background task '{}' completed", name),
                Err(e) => log::error!("Background task '{}': {}", name, e),
            }
        });
    }

    /// Wait until no tracked work remains, or until `grace` elapses
    pub async fn wait_drain(&self, grace: Duration) -> Result<(), ShutdownTimeout> {
        let drained = async {
            loop {
                let notified = self.inner.drained.notified();
                tokio::pin!(notified);
                // Register before checking so a concurrent last decrement is not missed
                notified.as_mut().enable();

                if self.outstanding() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(grace, drained)
            .await
            .map_err(|_| ShutdownTimeout {
                outstanding: self.outstanding(),
                grace,
            })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
