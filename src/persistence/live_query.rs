//! Observable Queries
//!
//! A `LiveQuery` is a shared, replaying stream of snapshots. One producer
//! task feeds every subscriber; it starts with the first subscriber and is
//! torn down once the last one has been gone for the grace period.

use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::invalidation::{InvalidationTracker, Table};
use crate::domain::DomainResult;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// One-shot fetch re-run on every relevant invalidation
pub type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<DomainResult<T>> + Send + Sync>;

type Slot<T> = Option<DomainResult<T>>;
type Producer<T> = Box<dyn Fn(Emitter<T>) -> BoxFuture<()> + Send + Sync>;

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write side handed to a producer task
struct Emitter<T> {
    tx: Arc<watch::Sender<Slot<T>>>,
}

impl<T> Emitter<T> {
    fn emit(&self, value: DomainResult<T>) {
        self.tx.send_replace(Some(value));
    }
}

#[derive(Default)]
struct State {
    subscribers: usize,
    task: Option<JoinHandle<()>>,
    teardown: Option<JoinHandle<()>>,
}

struct Shared<T> {
    name: String,
    /// Value replayed before the first emission and after teardown
    seed: Option<T>,
    grace: Duration,
    tx: Arc<watch::Sender<Slot<T>>>,
    producer: Producer<T>,
    state: Mutex<State>,
}

impl<T: Clone> Shared<T> {
    fn stop(&self, state: &mut State) {
        if let Some(task) = state.task.take() {
            task.abort();
            debug!("{}: stopped", self.name);
        }
        self.tx.send_replace(self.seed.clone().map(Ok));
    }

    fn stop_if_idle(&self) {
        let mut state = lock(&self.state);
        if state.subscribers == 0 {
            state.teardown = None;
            self.stop(&mut state);
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if let Some(timer) = state.teardown.take() {
            timer.abort();
        }
    }
}

/// Type-erased handle a subscription uses to give its slot back
trait Release: Send + Sync {
    fn release(self: Arc<Self>);
}

impl<T: Clone + Send + Sync + 'static> Release for Shared<T> {
    fn release(self: Arc<Self>) {
        let mut state = lock(&self.state);
        state.subscribers = state.subscribers.saturating_sub(1);
        if state.subscribers > 0 {
            return;
        }

        let handle = match Handle::try_current() {
            Ok(handle) if !self.grace.is_zero() => handle,
            _ => {
                self.stop(&mut state);
                return;
            }
        };

        debug!("{}: idle, stopping in {:?}", self.name, self.grace);
        let weak = Arc::downgrade(&self);
        let grace = self.grace;
        state.teardown = Some(handle.spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(shared) = weak.upgrade() {
                shared.stop_if_idle();
            }
        }));
    }
}

struct Lease {
    shared: Option<Arc<dyn Release>>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

/// Shared observable query
pub struct LiveQuery<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for LiveQuery<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> LiveQuery<T> {
    fn with_producer(name: String, seed: Option<T>, grace: Duration, producer: Producer<T>) -> Self {
        let (tx, _) = watch::channel(seed.clone().map(Ok));
        Self {
            shared: Arc::new(Shared {
                name,
                seed,
                grace,
                tx: Arc::new(tx),
                producer,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Query that re-runs `fetch` whenever one of `tables` is written
    pub fn from_tables(
        name: impl Into<String>,
        tracker: InvalidationTracker,
        tables: Vec<Table>,
        grace: Duration,
        fetch: QueryFn<T>,
    ) -> Self {
        let name = name.into();
        let label = name.clone();
        let producer: Producer<T> = Box::new(move |emitter: Emitter<T>| {
            Box::pin(run_table_query(
                label.clone(),
                tracker.clone(),
                tables.clone(),
                fetch.clone(),
                emitter,
            )) as BoxFuture<()>
        });
        Self::with_producer(name, None, grace, producer)
    }

    /// Derived query fed by this one.
    ///
    /// `initial` is what subscribers see before the first upstream value
    /// arrives. The upstream subscription is held only while the derived
    /// query itself is active.
    pub fn map_state<U, F>(&self, name: impl Into<String>, initial: Option<U>, grace: Duration, f: F) -> LiveQuery<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        let producer: Producer<U> = Box::new(move |emitter: Emitter<U>| {
            let upstream = upstream.clone();
            let f = f.clone();
            Box::pin(async move {
                let mut source = upstream.subscribe();
                while let Some(result) = source.next().await {
                    emitter.emit(result.map(|value| f(&value)));
                }
            }) as BoxFuture<()>
        });
        LiveQuery::with_producer(name.into(), initial, grace, producer)
    }

    /// Start observing. Must be called from within a Tokio runtime.
    pub fn subscribe(&self) -> Subscription<T> {
        let shared = &self.shared;
        let mut state = lock(&shared.state);
        state.subscribers += 1;

        if let Some(timer) = state.teardown.take() {
            timer.abort();
        }

        let running = state.task.as_ref().is_some_and(|task| !task.is_finished());
        if !running {
            debug!("{}: starting", shared.name);
            let emitter = Emitter {
                tx: shared.tx.clone(),
            };
            state.task = Some(tokio::spawn((shared.producer)(emitter)));
        }

        let rx = shared.tx.subscribe();
        drop(state);

        let release: Arc<dyn Release> = shared.clone();
        Subscription {
            rx,
            replay: true,
            _lease: Lease {
                shared: Some(release),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.state).subscribers
    }

    /// True while the producer task is running (including the grace period)
    pub fn is_active(&self) -> bool {
        lock(&self.shared.state)
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Latest cached snapshot, if any
    pub fn latest(&self) -> Option<DomainResult<T>> {
        self.shared.tx.borrow().clone()
    }
}

async fn run_table_query<T>(
    name: String,
    tracker: InvalidationTracker,
    tables: Vec<Table>,
    fetch: QueryFn<T>,
    emitter: Emitter<T>,
) where
    T: Send + Sync + 'static,
{
    let mut versions = tracker.subscribe();
    loop {
        // Taken before the fetch so writes landing mid-query trigger a re-run
        let seen = *versions.borrow_and_update();

        let result = fetch().await;
        if let Err(e) = &result {
            warn!("{}: query failed: {}", name, e);
        }
        emitter.emit(result);

        loop {
            if versions.changed().await.is_err() {
                return;
            }
            let now = *versions.borrow_and_update();
            if seen.changed_since(&now, &tables) {
                break;
            }
        }
    }
}

/// A subscriber's view of a `LiveQuery`.
///
/// Dropping it releases the subscriber slot.
pub struct Subscription<T> {
    rx: watch::Receiver<Slot<T>>,
    replay: bool,
    _lease: Lease,
}

impl<T: Clone> Subscription<T> {
    /// Next snapshot. The first call replays the cached value if there is
    /// one. Returns `None` only if the query is gone.
    pub async fn next(&mut self) -> Option<DomainResult<T>> {
        if std::mem::take(&mut self.replay) {
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }
        loop {
            self.rx.changed().await.ok()?;
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }
    }

    /// Wait for a snapshot matching `predicate`
    pub async fn next_matching<P>(&mut self, mut predicate: P) -> Option<DomainResult<T>>
    where
        P: FnMut(&DomainResult<T>) -> bool,
    {
        loop {
            let value = self.next().await?;
            if predicate(&value) {
                return Some(value);
            }
        }
    }

    pub fn latest(&self) -> Option<DomainResult<T>> {
        self.rx.borrow().clone()
    }
}
