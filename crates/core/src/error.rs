use std::io;
use std::sync::Arc;

/// Errors that can occur while resolving run targets
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The lookup finished but produced no usable target
    #[error("{0}")]
    NoTargetFound(String),

    /// The background computation failed; `cause` keeps the original error
    #[error("Target lookup failed: {message}")]
    LookupFailed {
        message: String,
        #[source]
        cause: Option<Arc<Error>>,
    },

    #[error("Resolution cancelled")]
    Cancelled,

    /// A newer pending context took over the configuration
    #[error("Resolution superseded by a newer pending context")]
    Superseded,

    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("Invalid run configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Pending context nested deeper than {0} levels")]
    UnwrapDepthExceeded(usize),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps a failure from a background computation, keeping it as the cause.
    pub fn lookup_failed(cause: Arc<Error>) -> Self {
        Error::LookupFailed {
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    /// Only these two kinds are ever shown to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Error::NoTargetFound(_) | Error::LookupFailed { .. })
    }

    /// Cancellation and supersession are normal control flow.
    pub fn is_silent(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Superseded)
    }
}

/// Result type alias for runtarget operations
pub type Result<T> = std::result::Result<T, Error>;

/// Receives the failures a user should see.
///
/// Only [`Error::NoTargetFound`] and [`Error::LookupFailed`] are delivered here; everything
/// else is dropped by [`report`].
pub trait ErrorReporter: Send + Sync {
    fn no_target_found(&self, message: &str);

    fn lookup_failed(&self, error: &Error);
}

/// Routes an error to the user-facing channel or to the debug log.
pub fn report(error: &Error, reporter: &dyn ErrorReporter) {
    match error {
        Error::NoTargetFound(message) => reporter.no_target_found(message),
        Error::LookupFailed { .. } => {
            tracing::warn!("run target lookup failed: {:?}", error);
            reporter.lookup_failed(error);
        }
        Error::Cancelled | Error::Superseded => {
            tracing::debug!("dropping silent resolution outcome: {}", error);
        }
        other => {
            tracing::warn!("unexpected resolution error: {}", other);
            reporter.lookup_failed(other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    impl ErrorReporter for Recorder {
        fn no_target_found(&self, message: &str) {
            self.messages.lock().push(format!("none: {message}"));
        }

        fn lookup_failed(&self, error: &Error) {
            self.messages.lock().push(format!("failed: {error}"));
        }
    }

    #[test]
    fn test_silent_errors_are_not_reported() {
        let recorder = Recorder::default();
        report(&Error::Cancelled, &recorder);
        report(&Error::Superseded, &recorder);
        assert!(recorder.messages.lock().is_empty());
    }

    #[test]
    fn test_user_visible_errors_are_reported() {
        let recorder = Recorder::default();
        report(&Error::NoTargetFound("No Bazel target found.".into()), &recorder);
        report(
            &Error::lookup_failed(Arc::new(Error::Other("query crashed".into()))),
            &recorder,
        );

        let messages = recorder.messages.lock();
        assert_eq!(messages[0], "none: No Bazel target found.");
        assert_eq!(messages[1], "failed: Target lookup failed: query crashed");
    }

    #[test]
    fn test_lookup_failed_keeps_cause() {
        let err = Error::lookup_failed(Arc::new(Error::ParseError("bad proto".into())));
        let source = std::error::Error::source(&err).expect("cause");
        assert_eq!(source.to_string(), "Parse error: bad proto");
        assert!(err.is_user_visible());
        assert!(!Error::Cancelled.is_user_visible());
    }
}
