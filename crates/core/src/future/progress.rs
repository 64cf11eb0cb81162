use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::listenable::{FutureError, ListenableFuture, Outcome};
use crate::error::Error;

/// Host-side progress display for a blocking wait.
///
/// The host decides how to render it (a modal dialog, a terminal spinner, nothing at all);
/// [`is_cancelled`](ProgressIndicator::is_cancelled) is how the user asks to stop waiting.
pub trait ProgressIndicator: Send + Sync {
    fn start(&self, message: &str);

    fn stop(&self);

    fn is_cancelled(&self) -> bool;
}

/// Indicator that shows nothing and is never cancelled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn start(&self, _message: &str) {}

    fn stop(&self) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A [`CancellationToken`] works as a cancel button the host can press from any thread.
impl ProgressIndicator for CancellationToken {
    fn start(&self, message: &str) {
        tracing::debug!("progress started: {}", message);
    }

    fn stop(&self) {}

    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

struct StopOnDrop<'a>(&'a dyn ProgressIndicator);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Options for [`wait_under_progress`]
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// How often the indicator is checked for cancellation
    pub poll_interval: Duration,
    /// Give up after this long; the future is cancelled and the wait fails
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(25),
            timeout: None,
        }
    }
}

/// Blocks the calling thread until `future` is done, showing `indicator` meanwhile.
///
/// Cancelling the indicator cancels `future` and returns [`FutureError::Cancelled`]. The cancel
/// travels on to the inputs `future` depends on, stopping at inputs other futures still need.
/// Must not be called on the thread that is expected to complete `future`.
pub fn wait_under_progress<T>(
    future: &ListenableFuture<T>,
    indicator: &dyn ProgressIndicator,
    message: &str,
    options: WaitOptions,
) -> Outcome<T>
where
    T: Clone + Send + 'static,
{
    if let Some(outcome) = future.try_outcome() {
        return outcome;
    }

    indicator.start(message);
    let _stop = StopOnDrop(indicator);
    let started = Instant::now();

    loop {
        if let Some(outcome) = future.wait_timeout(options.poll_interval) {
            return outcome;
        }
        if indicator.is_cancelled() {
            tracing::debug!("progress cancelled, cancelling '{}'", message);
            future.cancel();
            return Err(FutureError::Cancelled);
        }
        if let Some(timeout) = options.timeout {
            if started.elapsed() >= timeout {
                future.cancel();
                return Err(FutureError::failed(Error::Other(format!(
                    "{message} timed out after {}ms",
                    timeout.as_millis()
                ))));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::Promise;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
        cancel: CancellationToken,
    }

    impl ProgressIndicator for Recording {
        fn start(&self, message: &str) {
            self.events.lock().push(format!("start {message}"));
        }

        fn stop(&self) {
            self.events.lock().push("stop".to_string());
        }

        fn is_cancelled(&self) -> bool {
            self.cancel.is_cancelled()
        }
    }

    #[test]
    fn test_done_future_skips_indicator() {
        let indicator = Recording::default();
        let outcome = wait_under_progress(
            &ListenableFuture::ready(3),
            &indicator,
            "Resolving",
            WaitOptions::default(),
        );
        assert_eq!(outcome.unwrap(), 3);
        assert!(indicator.events.lock().is_empty());
    }

    #[test]
    fn test_completion_from_other_thread() {
        let promise = Promise::new();
        let future = promise.future();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            promise.complete("target");
        });

        let indicator = Recording::default();
        let outcome = wait_under_progress(&future, &indicator, "Resolving", WaitOptions::default());
        handle.join().unwrap();

        assert_eq!(outcome.unwrap(), "target");
        assert_eq!(*indicator.events.lock(), vec!["start Resolving", "stop"]);
    }

    #[test]
    fn test_cancel_propagates_to_future() {
        let promise: Promise<u8> = Promise::new();
        let future = promise.future();
        let indicator = Recording::default();
        indicator.cancel.cancel();

        let outcome = wait_under_progress(&future, &indicator, "Resolving", WaitOptions::default());
        assert!(matches!(outcome, Err(FutureError::Cancelled)));
        assert!(future.is_cancelled());
        assert!(promise.is_cancelled());
    }

    #[test]
    fn test_timeout_fails_wait() {
        let promise: Promise<u8> = Promise::new();
        let future = promise.future();
        let options = WaitOptions {
            poll_interval: Duration::from_millis(5),
            timeout: Some(Duration::from_millis(20)),
        };
        let outcome = wait_under_progress(&future, &NoProgress, "Resolving", options);
        match outcome {
            Err(FutureError::Failed(e)) => assert!(e.to_string().contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
