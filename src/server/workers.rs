//! Task submission for connection handling.
//!
//! Every accepted connection becomes one task, spawned through
//! [`Workers::submit`]. There is no cap on how many run at once.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Workers {
    active: Arc<AtomicUsize>,
}

impl Workers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the runtime and counts it until it finishes.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = WorkerGuard::new(Arc::clone(&self.active));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of submitted tasks that have not finished.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements the active count when dropped, including on panic.
#[derive(Debug)]
struct WorkerGuard {
    active: Arc<AtomicUsize>,
}

impl WorkerGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
