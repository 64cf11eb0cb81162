use std::io::Write;
use std::time::Instant;

use parking_lot::Mutex;
use runtarget_core::future::ProgressIndicator;
use tracing::debug;

/// Prints the wait message to stderr and the elapsed time once the wait ends.
#[derive(Debug, Default)]
pub struct TerminalProgress {
    started: Mutex<Option<Instant>>,
    quiet: bool,
}

impl TerminalProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }
}

impl ProgressIndicator for TerminalProgress {
    fn start(&self, message: &str) {
        *self.started.lock() = Some(Instant::now());
        if !self.quiet {
            eprint!("⏳ {message}...");
            std::io::stderr().flush().ok();
        }
    }

    fn stop(&self) {
        let elapsed = self.started.lock().take().map(|start| start.elapsed());
        if let Some(elapsed) = elapsed {
            debug!("wait finished after {:?}", elapsed);
            if !self.quiet {
                eprintln!(" done ({} ms)", elapsed.as_millis());
            }
        }
    }

    // No cancel control in a terminal session; the wait timeout bounds it instead
    fn is_cancelled(&self) -> bool {
        false
    }
}
