//! Detached execution of forward tasks
//!
//! The track handler answers `202` before the Conversions API call finishes.
//! How the call is run is behind [`Dispatcher`] so tests can swap the
//! spawning dispatcher for one that runs the task to completion.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

/// A unit of work whose result is consumed only by logging
pub type DetachedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Dispatcher interface
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatcher name
    fn name(&self) -> &str;

    /// Hand off a task. Implementations decide whether this waits for it.
    async fn dispatch_detached(&self, task: DetachedTask);
}

/// Spawns each task onto the Tokio runtime and returns immediately
///
/// Tasks still running when the process exits are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDispatcher;

#[async_trait]
impl Dispatcher for TokioDispatcher {
    fn name(&self) -> &str {
        "tokio"
    }

    async fn dispatch_detached(&self, task: DetachedTask) {
        tokio::spawn(task);
    }
}

/// Runs each task to completion before returning
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

#[async_trait]
impl Dispatcher for InlineDispatcher {
    fn name(&self) -> &str {
        "inline"
    }

    async fn dispatch_detached(&self, task: DetachedTask) {
        task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_inline_dispatcher_completes_task() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        InlineDispatcher
            .dispatch_detached(Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
            }))
            .await;

        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tokio_dispatcher_does_not_wait() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        TokioDispatcher
            .dispatch_detached(Box::pin(async move {
                let _ = rx.await;
                flag.store(true, Ordering::SeqCst);
            }))
            .await;

        // Task is parked on the channel, so dispatch returned first
        assert!(!done.load(Ordering::SeqCst));

        tx.send(()).unwrap();
        for _ in 0..50 {
            if done.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_names() {
        assert_eq!(TokioDispatcher.name(), "tokio");
        assert_eq!(InlineDispatcher.name(), "inline");
    }
}
