//! Cloneable, listenable futures
//!
//! A [`ListenableFuture`] is a handle on a value that some other thread will produce through the
//! matching [`Promise`]. Any number of handles can observe the same computation: listeners
//! registered with [`ListenableFuture::on_complete`] run exactly once, on the completing thread,
//! or immediately on the caller's thread if the value is already there. Derived futures
//! ([`map`](ListenableFuture::map), [`and_then`](ListenableFuture::and_then)) count as dependents
//! of their input. Cancelling a derived future releases its input, and the input is cancelled in
//! turn once its last dependent let go, so a lookup shared by several observers keeps running
//! until none of them wants it.

use parking_lot::{Condvar, Mutex};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Terminal failure of a future
#[derive(Debug, Clone, thiserror::Error)]
pub enum FutureError {
    #[error("cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(Arc<Error>),
}

impl FutureError {
    pub fn failed(error: Error) -> Self {
        FutureError::Failed(Arc::new(error))
    }

    /// Maps a future failure onto the resolution error taxonomy.
    ///
    /// `NoTargetFound` and cancellation keep their identity; any other failure becomes
    /// `LookupFailed` with the original error as its cause.
    pub fn into_resolution_error(self) -> Error {
        match self {
            FutureError::Cancelled => Error::Cancelled,
            FutureError::Failed(error) => match &*error {
                Error::NoTargetFound(message) => Error::NoTargetFound(message.clone()),
                Error::Cancelled => Error::Cancelled,
                Error::Superseded => Error::Superseded,
                _ => Error::lookup_failed(error),
            },
        }
    }
}

pub type Outcome<T> = std::result::Result<T, FutureError>;

type Listener<T> = Box<dyn FnOnce(Outcome<T>) + Send>;
type CancelHook = Box<dyn FnOnce() + Send>;

enum State<T> {
    Running {
        listeners: Vec<Listener<T>>,
        /// Releases the inputs this future waits on; run only if it is cancelled
        on_cancel: Vec<CancelHook>,
    },
    Done(Outcome<T>),
}

struct Shared<T> {
    state: Mutex<State<T>>,
    finished: Condvar,
    cancelled: CancellationToken,
    dependents: AtomicUsize,
}

impl<T: Clone + Send + 'static> Shared<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Running {
                listeners: Vec::new(),
                on_cancel: Vec::new(),
            }),
            finished: Condvar::new(),
            cancelled: CancellationToken::new(),
            dependents: AtomicUsize::new(0),
        }
    }

    /// First settle wins; later calls are ignored and return false.
    fn settle(&self, outcome: Outcome<T>) -> bool {
        let previous = {
            let mut state = self.state.lock();
            if matches!(*state, State::Done(_)) {
                return false;
            }
            if matches!(outcome, Err(FutureError::Cancelled)) {
                self.cancelled.cancel();
            }
            std::mem::replace(&mut *state, State::Done(outcome.clone()))
        };
        self.finished.notify_all();

        let State::Running {
            listeners,
            on_cancel,
        } = previous
        else {
            return true;
        };
        if matches!(outcome, Err(FutureError::Cancelled)) {
            for hook in on_cancel {
                hook();
            }
        }
        for listener in listeners {
            run_listener(listener, outcome.clone());
        }
        true
    }
}

/// Listener panics are contained so they can't take down the completing thread.
fn run_listener<T>(listener: impl FnOnce(Outcome<T>), outcome: Outcome<T>) {
    if catch_unwind(AssertUnwindSafe(move || listener(outcome))).is_err() {
        tracing::error!("future listener panicked");
    }
}

/// Read side of an asynchronous computation
pub struct ListenableFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ListenableFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for ListenableFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.shared.state.lock() {
            State::Running { listeners, .. } => format!("running ({} listeners)", listeners.len()),
            State::Done(Ok(_)) => "done".to_string(),
            State::Done(Err(e)) => format!("failed: {e}"),
        };
        f.debug_struct("ListenableFuture").field("state", &state).finish()
    }
}

impl<T: Clone + Send + 'static> ListenableFuture<T> {
    /// An already-completed future
    pub fn ready(value: T) -> Self {
        let promise = Promise::new();
        let future = promise.future();
        promise.complete(value);
        future
    }

    /// An already-failed future
    pub fn failed(error: Error) -> Self {
        let promise = Promise::new();
        let future = promise.future();
        promise.fail(error);
        future
    }

    /// Runs `task` on a new named thread. Errors and panics become a failed future.
    ///
    /// `task` receives the future's cancellation token and may return early once it fires.
    pub fn spawn<F>(name: &str, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> crate::error::Result<T> + Send + 'static,
    {
        let promise = Promise::new();
        let future = promise.future();
        let token = promise.cancellation_token();
        let spawned = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                match catch_unwind(AssertUnwindSafe(move || task(token))) {
                    Ok(Ok(value)) => promise.complete(value),
                    Ok(Err(error)) => promise.fail(error),
                    Err(_) => promise.fail(Error::Other("background computation panicked".into())),
                };
            });
        if let Err(e) = spawned {
            return Self::failed(Error::IoError(e));
        }
        future
    }

    pub fn is_done(&self) -> bool {
        matches!(*self.shared.state.lock(), State::Done(_))
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.is_cancelled()
    }

    /// The outcome if the future is done, without blocking.
    pub fn try_outcome(&self) -> Option<Outcome<T>> {
        match &*self.shared.state.lock() {
            State::Done(outcome) => Some(outcome.clone()),
            State::Running { .. } => None,
        }
    }

    /// Cancels this future and releases its inputs. Returns false if it was already done.
    pub fn cancel(&self) -> bool {
        self.shared.settle(Err(FutureError::Cancelled))
    }

    /// Makes this future a dependent of `input`: cancelling it releases `input`.
    pub(crate) fn depends_on<U: Clone + Send + 'static>(&self, input: &ListenableFuture<U>) {
        input.shared.dependents.fetch_add(1, Ordering::SeqCst);
        let input = input.clone();
        self.on_cancel(move || input.release());
    }

    /// Drops one dependent; the last one to go cancels a still running future.
    fn release(&self) {
        let previous = self
            .shared
            .dependents
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous == Ok(1) && self.cancel() {
            tracing::debug!("last dependent released, input cancelled");
        }
    }

    fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.shared.state.lock();
            match &mut *state {
                State::Running { on_cancel, .. } => {
                    on_cancel.push(Box::new(hook));
                    return;
                }
                State::Done(Err(FutureError::Cancelled)) => {}
                State::Done(_) => return,
            }
        }
        hook();
    }

    /// Registers `listener`; runs it right away on this thread if the future is already done.
    pub fn on_complete<F>(&self, listener: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.shared.state.lock();
            match &mut *state {
                State::Running { listeners, .. } => {
                    listeners.push(Box::new(listener));
                    return;
                }
                State::Done(outcome) => outcome.clone(),
            }
        };
        run_listener(listener, outcome);
    }

    /// Blocks until the future is done.
    pub fn wait(&self) -> Outcome<T> {
        let mut state = self.shared.state.lock();
        loop {
            if let State::Done(outcome) = &*state {
                return outcome.clone();
            }
            self.shared.finished.wait(&mut state);
        }
    }

    /// Blocks for at most `timeout`; `None` if the future is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if let State::Done(outcome) = &*state {
                return Some(outcome.clone());
            }
            if self
                .shared
                .finished
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return match &*state {
                    State::Done(outcome) => Some(outcome.clone()),
                    State::Running { .. } => None,
                };
            }
        }
    }

    /// A derived future holding `f` applied to this future's value.
    pub fn map<U, F>(&self, f: F) -> ListenableFuture<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| ListenableFuture::ready(f(value)))
    }

    /// A derived future that continues with the future returned by `f`.
    ///
    /// While running it depends on this future, then on the one `f` returned.
    pub fn and_then<U, F>(&self, f: F) -> ListenableFuture<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> ListenableFuture<U> + Send + 'static,
    {
        let promise = Promise::new();
        let derived = promise.future();
        derived.depends_on(self);
        self.on_complete(move |outcome| match outcome {
            Ok(value) => {
                let next = f(value);
                promise.future().depends_on(&next);
                next.on_complete(move |next| {
                    promise.settle(next);
                });
            }
            Err(error) => {
                promise.settle(Err(error));
            }
        });
        derived
    }
}

/// Write side of a [`ListenableFuture`].
///
/// Dropping a promise that was never settled fails its future, so observers are never left
/// waiting on a computation that no longer exists.
pub struct Promise<T: Clone + Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
        }
    }

    pub fn future(&self) -> ListenableFuture<T> {
        ListenableFuture {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn complete(&self, value: T) -> bool {
        self.shared.settle(Ok(value))
    }

    pub fn fail(&self, error: Error) -> bool {
        self.shared.settle(Err(FutureError::failed(error)))
    }

    pub fn settle(&self, outcome: Outcome<T>) -> bool {
        self.shared.settle(outcome)
    }

    /// Long-running producers poll this to stop early.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.is_cancelled()
    }

    /// Token that fires when the future is cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancelled.clone()
    }
}

impl<T: Clone + Send + 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        if self
            .shared
            .settle(Err(FutureError::failed(Error::Other(
                "computation dropped without a result".into(),
            ))))
        {
            tracing::debug!("promise dropped before completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_listener_on_done_future_still_fires() {
        let future = ListenableFuture::ready(7);
        let (tx, rx) = mpsc::channel();
        future.on_complete(move |outcome| tx.send(outcome.unwrap()).unwrap());
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_listeners_fire_once_on_completion() {
        let promise = Promise::new();
        let future = promise.future();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            future.on_complete(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(promise.complete("done"));
        assert!(!promise.complete("again"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(future.wait().unwrap(), "done");
    }

    #[test]
    fn test_wait_across_threads() {
        let promise = Promise::new();
        let future = promise.future();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            promise.complete(42u32);
        });
        assert_eq!(future.wait().unwrap(), 42);
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_returns_none_while_running() {
        let promise: Promise<u8> = Promise::new();
        let future = promise.future();
        assert!(future.wait_timeout(Duration::from_millis(5)).is_none());
        promise.complete(1);
        assert_eq!(future.wait_timeout(Duration::from_millis(5)).unwrap().unwrap(), 1);
    }

    #[test]
    fn test_cancelling_derived_future_leaves_upstream_alone() {
        let promise = Promise::new();
        let upstream = promise.future();
        let first = upstream.map(|v: u32| v + 1);
        let second = upstream.map(|v: u32| v * 10);

        assert!(first.cancel());
        assert!(!upstream.is_done());

        promise.complete(4);
        assert!(matches!(first.wait(), Err(FutureError::Cancelled)));
        assert_eq!(second.wait().unwrap(), 40);
        assert_eq!(upstream.wait().unwrap(), 4);
    }

    #[test]
    fn test_cancelling_only_dependent_cancels_upstream() {
        let promise: Promise<u32> = Promise::new();
        let token = promise.cancellation_token();
        let derived = promise.future().map(|v| v + 1).map(|v| v * 2);

        assert!(derived.cancel());
        assert!(promise.is_cancelled());
        assert!(token.is_cancelled());
        assert!(!promise.complete(1));
    }

    #[test]
    fn test_upstream_cancelled_when_last_dependent_lets_go() {
        let promise: Promise<u32> = Promise::new();
        let upstream = promise.future();
        let first = upstream.map(|v| v + 1);
        let second = upstream.map(|v| v * 10);

        first.cancel();
        assert!(!promise.is_cancelled());
        second.cancel();
        assert!(promise.is_cancelled());
    }

    #[test]
    fn test_cancel_reaches_second_stage_of_and_then() {
        let first = Promise::new();
        let second: Promise<u32> = Promise::new();
        let second_future = second.future();
        let chained = first.future().and_then(move |_: u32| second_future.clone());

        first.complete(1);
        assert!(chained.cancel());
        assert!(second.is_cancelled());
    }

    #[test]
    fn test_spawned_task_sees_cancellation() {
        let (started_tx, started_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let future: ListenableFuture<u8> = ListenableFuture::spawn("cancellable", move |token| {
            started_tx.send(()).unwrap();
            while !token.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            done_tx.send(()).unwrap();
            Ok(0)
        });

        started_rx.recv().unwrap();
        future.cancel();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(future.is_cancelled());
    }

    #[test]
    fn test_and_then_chains_futures() {
        let promise = Promise::new();
        let inner = Promise::new();
        let inner_future = inner.future();
        let chained = promise
            .future()
            .and_then(move |v: u32| inner_future.map(move |w: u32| v + w));

        promise.complete(1);
        assert!(!chained.is_done());
        inner.complete(2);
        assert_eq!(chained.wait().unwrap(), 3);
    }

    #[test]
    fn test_dropped_promise_fails_future() {
        let promise: Promise<u8> = Promise::new();
        let future = promise.future();
        drop(promise);
        match future.wait() {
            Err(FutureError::Failed(e)) => {
                assert!(e.to_string().contains("dropped without a result"))
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_spawn_converts_panics() {
        let future: ListenableFuture<u8> = ListenableFuture::spawn("panicky", |_| panic!("boom"));
        assert!(matches!(future.wait(), Err(FutureError::Failed(_))));
    }

    #[test]
    fn test_resolution_error_mapping() {
        let none = FutureError::failed(Error::NoTargetFound("No Bazel target found.".into()));
        assert!(matches!(
            none.into_resolution_error(),
            Error::NoTargetFound(ref m) if m == "No Bazel target found."
        ));

        let crash = FutureError::failed(Error::Other("query crashed".into()));
        match crash.into_resolution_error() {
            Error::LookupFailed { cause, .. } => {
                assert_eq!(cause.unwrap().to_string(), "query crashed")
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            FutureError::Cancelled.into_resolution_error(),
            Error::Cancelled
        ));
    }
}
