//! Coalescing of bursty recompute triggers.
//!
//! Each [`CoalescingScheduler::trigger`] takes a fresh token and supersedes
//! whatever was pending. A task only runs if its token is still current once
//! the quiescence window has passed, so a burst of triggers runs exactly one
//! recompute: the last one.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct CoalescingScheduler {
    quiescence: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for CoalescingScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIESCENCE)
    }
}

impl CoalescingScheduler {
    pub fn new(quiescence: Duration) -> Self {
        Self {
            quiescence,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn quiescence(&self) -> Duration {
        self.quiescence
    }

    /// Token of the most recent trigger.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Schedule `task`, replacing any pending one. The handle resolves to
    /// `true` if the task ran and `false` if a later trigger superseded it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger<F, Fut>(&self, task: F) -> JoinHandle<bool>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let quiescence = self.quiescence;
        tokio::spawn(async move {
            tokio::time::sleep(quiescence).await;
            if generation.load(Ordering::SeqCst) != token {
                tracing::trace!(token, "superseded before quiescence");
                return false;
            }
            task().await;
            true
        })
    }

    /// Drop whatever is pending without scheduling anything new.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
