//! Fixed-interval polling against remote poll targets.
//!
//! Externally-driven changes (dispatch assigning a trip, a cancellation from
//! another device) only become visible through these loops. A failed tick is
//! logged and skipped: polling never dies from one bad response. Consecutive
//! duplicate results are suppressed so downstream state machines only see
//! genuine changes.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::InteractorError;

/// Owner handle for a background poll task. Dropping it cancels the poll;
/// subscriptions scoped to a screen die with the screen.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Polls `fetch` every `every`, discarding `None` results and suppressing
/// consecutive duplicates, and hands each distinct value to `sink`.
pub fn poll_distinct<T, F, Fut, S>(every: Duration, fetch: F, mut sink: S) -> PollHandle
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<T>, InteractorError>> + Send,
    S: FnMut(T) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        let mut last: Option<T> = None;
        loop {
            ticker.tick().await;
            match fetch().await {
                Ok(Some(value)) => {
                    if last.as_ref() != Some(&value) {
                        last = Some(value.clone());
                        sink(value);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "poll tick failed; will retry on next tick");
                }
            }
        }
    });
    PollHandle { task }
}

/// A polled remote state shared by multiple subscribers through one
/// underlying request loop. Subscribers get replay-latest semantics; the
/// backing poll runs once regardless of subscriber count.
pub struct SharedStatePoller<T> {
    current: watch::Receiver<T>,
    _poll: PollHandle,
}

impl<T> SharedStatePoller<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn spawn<F, Fut>(initial: T, every: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, InteractorError>> + Send,
    {
        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match fetch().await {
                    Ok(value) => {
                        // send_if_modified keeps duplicate results silent.
                        tx.send_if_modified(|current| {
                            if *current == value {
                                false
                            } else {
                                *current = value;
                                true
                            }
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "shared poll tick failed; keeping previous value");
                    }
                }
            }
        });
        Self {
            current: rx,
            _poll: PollHandle { task },
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.current.clone()
    }

    pub fn current(&self) -> T {
        self.current.borrow().clone()
    }
}
