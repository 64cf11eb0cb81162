use std::sync::atomic::{AtomicBool, Ordering};

use runtarget_core::{Error, ErrorReporter};

/// Writes user-facing resolution failures to stderr.
#[derive(Debug, Default)]
pub struct StderrReporter {
    reported: AtomicBool,
}

impl StderrReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything was shown to the user
    pub fn reported(&self) -> bool {
        self.reported.load(Ordering::SeqCst)
    }
}

impl ErrorReporter for StderrReporter {
    fn no_target_found(&self, message: &str) {
        self.reported.store(true, Ordering::SeqCst);
        eprintln!("❌ {message}");
    }

    fn lookup_failed(&self, error: &Error) {
        self.reported.store(true, Ordering::SeqCst);
        eprintln!("❌ {error}");
        if let Error::LookupFailed {
            cause: Some(cause), ..
        } = error
        {
            eprintln!("   caused by: {cause}");
        }
    }
}
