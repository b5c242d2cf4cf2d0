//! Background execution of world searches.
//!
//! The controller never blocks on a search. It packages a
//! [`RescanRequest`](crate::search::RescanRequest) into a [`SearchTask`]
//! and hands it to a [`SearchExecutor`]; the task sends its result over a
//! single-slot channel that the controller polls on a later tick.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tracing::debug;

/// A unit of background work.
pub type SearchTask = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere to run background searches.
pub trait SearchExecutor {
    /// Run `task`, now or later, on any thread.
    fn execute(&self, task: SearchTask);
}

/// Runs tasks on the tokio blocking pool.
#[derive(Debug, Clone)]
pub struct TokioSearchExecutor {
    handle: Handle,
}

impl TokioSearchExecutor {
    /// Use the given runtime.
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context, if there is one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl SearchExecutor for TokioSearchExecutor {
    fn execute(&self, task: SearchTask) {
        drop(self.handle.spawn_blocking(task));
    }
}

/// Runs tasks immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl SearchExecutor for InlineExecutor {
    fn execute(&self, task: SearchTask) {
        task();
    }
}

/// Holds tasks until [`QueuedExecutor::run_pending`] is called.
///
/// Clones share one queue, so a caller can keep a handle after giving the
/// executor away.
#[derive(Clone, Default)]
pub struct QueuedExecutor {
    queue: Arc<Mutex<VecDeque<SearchTask>>>,
}

impl QueuedExecutor {
    /// An executor with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run every waiting task in submission order. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<SearchTask> = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        debug!(count, "Ran queued search tasks");
        count
    }
}

impl SearchExecutor for QueuedExecutor {
    fn execute(&self, task: SearchTask) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;

    #[test]
    fn inline_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        InlineExecutor.execute(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queued_waits_for_release() {
        let executor = QueuedExecutor::new();
        let handle = executor.clone();
        let (sender, mut receiver) = oneshot::channel();
        executor.execute(Box::new(move || {
            let _ = sender.send(7_u32);
        }));

        assert_eq!(handle.pending(), 1);
        assert!(receiver.try_recv().is_err());
        assert_eq!(handle.run_pending(), 1);
        assert_eq!(receiver.try_recv().unwrap(), 7);
    }

    #[tokio::test]
    async fn tokio_executor_delivers_through_the_channel() {
        let executor = TokioSearchExecutor::current().unwrap();
        let (sender, receiver) = oneshot::channel();
        executor.execute(Box::new(move || {
            let _ = sender.send(vec![1_u8, 2, 3]);
        }));
        assert_eq!(receiver.await.unwrap(), vec![1, 2, 3]);
    }
}
