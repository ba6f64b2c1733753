//! Tracking for fire-and-forget background work.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

/// Spawned reloads and preloads, kept so callers can wait for them to drain.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` on the current runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut handles = self.handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of tasks not yet finished.
    pub fn pending(&self) -> usize {
        self.handles().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait until every spawned task, including ones spawned while waiting,
    /// has finished.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.handles());
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "Background sync task failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_settle_waits_for_nested_spawns() {
        let tasks = Arc::new(BackgroundTasks::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_tasks = Arc::clone(&tasks);
        let inner_counter = Arc::clone(&counter);
        tasks.spawn(async move {
            inner_counter.fetch_add(1, Ordering::SeqCst);
            let nested = Arc::clone(&inner_counter);
            inner_tasks.spawn(async move {
                tokio::task::yield_now().await;
                nested.fetch_add(1, Ordering::SeqCst);
            });
        });

        tasks.settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(tasks.pending(), 0);
    }
}
