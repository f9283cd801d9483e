//! Unit of work abstraction
//!
//! A [`Task`] is an opaque computation that, once started, settles at most
//! once through its [`Settler`]. Starting is synchronous: the closure runs
//! to its first return before [`Task::start`] hands back the [`Pending`]
//! future. Whatever it defers (timers, I/O, spawned work) settles later.
//!
//! A panic inside the start closure, or inside a [`Task::from_future`]
//! future, settles the unit with [`Failure::Panicked`].

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::warn;

type Slot<T, E> = Arc<Mutex<Option<oneshot::Sender<Result<T, Failure<E>>>>>>;

/// Why a started unit did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure<E> {
    /// The unit settled with failure
    Rejected(E),
    /// The unit panicked before settling
    Panicked(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Settle handle given to a unit of work when it starts
///
/// Clones share one slot; the first `resolve`/`reject`/`settle` call fixes
/// the outcome and every later call is a no-op.
pub struct Settler<T, E> {
    slot: Slot<T, E>,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> Settler<T, E> {
    /// Settle with success. Returns `true` if this call fixed the outcome.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with failure. Returns `true` if this call fixed the outcome.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        self.fix(outcome.map_err(Failure::Rejected))
    }

    pub(crate) fn panicked(&self, message: String) -> bool {
        self.fix(Err(Failure::Panicked(message)))
    }

    fn fix(&self, outcome: Result<T, Failure<E>>) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(sender) => {
                // A closed receiver means the runner already gave up on this unit
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<T, E> fmt::Debug for Settler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settler")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// An unstarted unit of work
pub struct Task<T, E> {
    start: Box<dyn FnOnce(Settler<T, E>) + Send + 'static>,
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap a closure that receives the settle handle when the task starts
    pub fn new<F>(start: F) -> Self
    where
        F: FnOnce(Settler<T, E>) + Send + 'static,
    {
        Self {
            start: Box::new(start),
        }
    }

    /// A task that succeeds synchronously with `value`
    pub fn ok(value: T) -> Self {
        Self::new(move |settler| {
            settler.resolve(value);
        })
    }

    /// A task that fails synchronously with `error`
    pub fn err(error: E) -> Self {
        Self::new(move |settler| {
            settler.reject(error);
        })
    }

    /// A synchronous computation, run when the task starts
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        Self::new(move |settler| {
            settler.settle(f());
        })
    }

    /// A future spawned on the current tokio runtime when the task starts
    ///
    /// # Panics
    ///
    /// Starting the task outside a tokio runtime panics, as `tokio::spawn` does.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(move |settler| {
            tokio::spawn(async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(outcome) => settler.settle(outcome),
                    Err(payload) => settler.panicked(panic_message(&*payload)),
                };
            });
        })
    }

    /// Run the start closure now and return a future for the outcome
    ///
    /// Work the closure spawns on its own is not watched; a panic there
    /// leaves the unit unsettled.
    pub fn start(self) -> Pending<T, E> {
        let (sender, receiver) = oneshot::channel();
        let settler = Settler {
            slot: Arc::new(Mutex::new(Some(sender))),
        };
        let start = self.start;
        let handle = settler.clone();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || start(handle))) {
            settler.panicked(panic_message(&*payload));
        }
        Pending {
            receiver,
            abandoned: false,
        }
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// Outcome of a started task
///
/// If the unit drops every [`Settler`] without settling, this future never
/// completes.
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct Pending<T, E> {
    receiver: oneshot::Receiver<Result<T, Failure<E>>>,
    abandoned: bool,
}

impl<T, E> Future for Pending<T, E> {
    type Output = Result<T, Failure<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.abandoned {
            return Poll::Pending;
        }

        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => {
                warn!("Unit of work dropped its settle handle without settling; it will stay pending");
                self.abandoned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
