//! Generic serialized state container backing every view-model in this core.
//!
//! UI event handlers and background poll results both want to mutate the same
//! piece of screen state. Rather than hand out locks, each view-model owns one
//! `StateMachine<T>`: transition requests go through a single-consumer queue,
//! the worker applies them strictly in submission order, and committed states
//! fan out through a replay-latest `watch` channel. A transition always
//! receives the state produced by the previous transition, never a stale
//! snapshot, and a failing transition is absorbed (logged, state preserved)
//! so one bad request can never halt or corrupt a screen. The committed
//! stream is strictly change-only: re-committing an equal state versions
//! nothing and wakes nobody.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::TransitionError;

type TransitionFuture<T> = Pin<Box<dyn Future<Output = Result<T, TransitionError>> + Send>>;
type TransitionRequest<T> = Box<dyn FnOnce(T) -> TransitionFuture<T> + Send>;

pub struct StateMachine<T> {
    requests: mpsc::UnboundedSender<TransitionRequest<T>>,
    committed: watch::Receiver<T>,
    worker: JoinHandle<()>,
}

impl<T> StateMachine<T>
where
    T: Clone + fmt::Debug + PartialEq + Send + Sync + 'static,
{
    /// Creates a machine holding `initial` and spawns its transition worker.
    ///
    /// Must be called from within a tokio runtime (view-models are always
    /// constructed on one).
    pub fn new(initial: T) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<TransitionRequest<T>>();
        let (committed_tx, committed_rx) = watch::channel(initial);

        let worker = tokio::spawn(async move {
            // One request at a time: awaiting here is what serializes
            // transitions and guarantees each sees the latest state.
            while let Some(apply) = request_rx.recv().await {
                let current = committed_tx.borrow().clone();
                match apply(current).await {
                    Ok(next) => {
                        // A transition may legitimately resolve to the state
                        // it started in (e.g. a side-effecting terminal op);
                        // observers only hear about genuine changes.
                        committed_tx.send_if_modified(|state| {
                            if *state == next {
                                false
                            } else {
                                *state = next;
                                true
                            }
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "transition rejected; state unchanged");
                    }
                }
            }
        });

        Self {
            requests: request_tx,
            committed: committed_rx,
            worker,
        }
    }

    /// Enqueues a synchronous transition. A returned error is logged by the
    /// worker and the current state is retained.
    pub fn transition<F>(&self, apply: F)
    where
        F: FnOnce(T) -> Result<T, TransitionError> + Send + 'static,
    {
        self.submit(Box::new(move |state| {
            Box::pin(async move { apply(state) }) as TransitionFuture<T>
        }));
    }

    /// Enqueues a transition whose new state arrives asynchronously (for
    /// example after a network call). Later transitions wait for it to
    /// resolve; failures follow the same soft-fail policy as `transition`.
    pub fn async_transition<F, Fut>(&self, apply: F)
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TransitionError>> + Send + 'static,
    {
        self.submit(Box::new(move |state| {
            Box::pin(apply(state)) as TransitionFuture<T>
        }));
    }

    /// Multicast stream of committed states. New subscribers observe the
    /// latest committed state immediately, then every subsequent change.
    pub fn observe(&self) -> watch::Receiver<T> {
        self.committed.clone()
    }

    /// Snapshot of the latest committed state.
    pub fn current(&self) -> T {
        self.committed.borrow().clone()
    }

    fn submit(&self, request: TransitionRequest<T>) {
        if self.requests.send(request).is_err() {
            // Only possible if the worker was torn down, i.e. mid-drop.
            warn!("state machine worker gone; transition dropped");
        }
    }
}

impl<T> Drop for StateMachine<T> {
    fn drop(&mut self) {
        // Screen teardown must not leave an in-flight transition running.
        self.worker.abort();
    }
}

/// Read-only stream derived from a committed-state stream by a total
/// mapping. Keeps replay-latest semantics.
pub struct Derived<U> {
    current: watch::Receiver<U>,
    forward: JoinHandle<()>,
}

impl<U: Clone> Derived<U> {
    pub fn observe(&self) -> watch::Receiver<U> {
        self.current.clone()
    }

    pub fn current(&self) -> U {
        self.current.borrow().clone()
    }
}

impl<U> Drop for Derived<U> {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

/// Maps every committed state through `map`, starting from the current one.
pub fn derive<T, U, F>(mut source: watch::Receiver<T>, map: F) -> Derived<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(&T) -> U + Send + 'static,
{
    let initial = map(&source.borrow_and_update());
    let (tx, rx) = watch::channel(initial);
    let forward = tokio::spawn(async move {
        while source.changed().await.is_ok() {
            let next = map(&source.borrow_and_update());
            if tx.send(next).is_err() {
                break;
            }
        }
    });
    Derived {
        current: rx,
        forward,
    }
}

/// Filtered projection of a committed-state stream: states for which
/// `provider` returns `None` produce no event at all, so a screen that only
/// cares about some variants stays silent until one of them arrives.
pub struct Projection<U> {
    events: mpsc::UnboundedReceiver<U>,
    forward: JoinHandle<()>,
}

impl<U> Projection<U> {
    /// Next relevant display model, or `None` once the source is gone.
    pub async fn next(&mut self) -> Option<U> {
        self.events.recv().await
    }

    pub fn try_next(&mut self) -> Option<U> {
        self.events.try_recv().ok()
    }
}

impl<U> Drop for Projection<U> {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

/// Projects `source` through `provider`, replaying the current state first
/// when it is relevant to this projection.
pub fn project<T, U, F>(mut source: watch::Receiver<T>, provider: F) -> Projection<U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + 'static,
    F: Fn(&T) -> Option<U> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let forward = tokio::spawn(async move {
        if let Some(model) = provider(&source.borrow_and_update()) {
            if tx.send(model).is_err() {
                return;
            }
        }
        while source.changed().await.is_ok() {
            if let Some(model) = provider(&source.borrow_and_update()) {
                if tx.send(model).is_err() {
                    break;
                }
            }
        }
    });
    Projection {
        events: rx,
        forward,
    }
}
