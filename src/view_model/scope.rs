//! Lifecycle Scope
//!
//! Owns every task a UI-facing component starts. Work runs one job at a
//! time on a single worker, in the order it was launched. Cancelling the
//! scope (or dropping it) aborts the worker and drops whatever is queued.
//! Writes that already committed stay committed; only delivery of their
//! results is suppressed.

use log::warn;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::{DomainError, DomainResult};
use crate::persistence::BoxFuture;

struct Worker {
    queue: mpsc::UnboundedSender<BoxFuture<()>>,
    task: JoinHandle<()>,
}

fn spawn_worker() -> Worker {
    let (queue, mut jobs) = mpsc::unbounded_channel::<BoxFuture<()>>();
    let task = tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            job.await;
        }
    });
    Worker { queue, task }
}

/// Counts a job from launch until it finishes or is dropped unrun
struct PendingJob(Arc<AtomicUsize>);

impl PendingJob {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for PendingJob {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct LifecycleScope {
    worker: Mutex<Option<Worker>>,
    pending: Arc<AtomicUsize>,
    cancelled: AtomicBool,
}

impl LifecycleScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `future` behind everything launched before it. Returns false
    /// once the scope is cancelled.
    pub fn launch<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock so a concurrent cancel can't miss this job
        if self.is_cancelled() {
            return false;
        }

        let pending = PendingJob::new(&self.pending);
        let job: BoxFuture<()> = Box::pin(async move {
            let _pending = pending;
            future.await;
        });

        let job = match slot.as_ref() {
            Some(worker) => match worker.queue.send(job) {
                Ok(()) => return true,
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        // First job, or the previous worker died mid-job
        let worker = slot.insert(spawn_worker());
        worker.queue.send(job).is_ok()
    }

    /// Run `operation` under this scope and hand its result to a `Completion`
    pub fn run<T, F>(&self, label: &'static str, operation: F) -> Completion<T>
    where
        T: Send + 'static,
        F: Future<Output = DomainResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.launch(async move {
            let result = operation.await;
            if let Err(e) = &result {
                warn!("{} failed: {}", label, e);
            }
            // Receiver gone means the caller chose fire-and-forget
            let _ = tx.send(result);
        });
        Completion { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Jobs launched and not yet finished, including queued ones
    pub fn active_tasks(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Abort running work, drop queued work and refuse new work
    pub fn cancel(&self) {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(worker) = slot.take() {
            worker.task.abort();
        }
    }
}

impl Drop for LifecycleScope {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Result of an operation launched on a `LifecycleScope`.
///
/// Dropping it is the fire-and-forget path.
#[must_use = "drop explicitly to ignore the outcome"]
pub struct Completion<T> {
    rx: oneshot::Receiver<DomainResult<T>>,
}

impl<T> Completion<T> {
    /// Wait for the outcome; `Cancelled` if the scope went away first
    pub async fn wait(self) -> DomainResult<T> {
        self.rx.await.unwrap_or(Err(DomainError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn test_completion_delivers_result() {
        let scope = LifecycleScope::new();
        let done = scope.run("answer", async { Ok(42) });
        assert_eq!(done.wait().await, Ok(42));

        let failed: Completion<()> = scope.run("fail", async { Err(DomainError::Storage("full".to_string())) });
        assert_eq!(failed.wait().await, Err(DomainError::Storage("full".to_string())));
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_work() {
        let scope = LifecycleScope::new();
        let slow = scope.run("slow", async {
            sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        assert_eq!(scope.active_tasks(), 1);

        scope.cancel();
        let outcome = timeout(Duration::from_secs(2), slow.wait()).await.unwrap();
        assert_eq!(outcome, Err(DomainError::Cancelled));
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_scope_refuses_new_work() {
        let scope = LifecycleScope::new();
        scope.cancel();

        assert!(!scope.launch(async {}));
        let late = scope.run("late", async { Ok(1) });
        assert_eq!(late.wait().await, Err(DomainError::Cancelled));
    }

    #[tokio::test]
    async fn test_fire_and_forget_still_runs() {
        let scope = LifecycleScope::new();
        let (tx, rx) = oneshot::channel();
        drop(scope.run("side effect", async move {
            let _ = tx.send(());
            Ok(())
        }));
        timeout(Duration::from_secs(2), rx).await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jobs_run_in_launch_order() {
        let scope = LifecycleScope::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut last = None;
        for step in 0..20u64 {
            let seen = seen.clone();
            // Earlier jobs sleep longer
            last = Some(scope.run("step", async move {
                sleep(Duration::from_millis(20 - step)).await;
                seen.lock().unwrap().push(step);
                Ok(())
            }));
        }
        timeout(Duration::from_secs(5), last.unwrap().wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_cancel_drops_queued_work() {
        let scope = LifecycleScope::new();
        let blocker = scope.run("blocker", async {
            sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        let queued = scope.run("queued", async { Ok(7) });
        assert_eq!(scope.active_tasks(), 2);

        scope.cancel();
        assert_eq!(timeout(Duration::from_secs(2), queued.wait()).await.unwrap(), Err(DomainError::Cancelled));
        assert_eq!(timeout(Duration::from_secs(2), blocker.wait()).await.unwrap(), Err(DomainError::Cancelled));
        timeout(Duration::from_secs(2), async {
            while scope.active_tasks() > 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }
}
