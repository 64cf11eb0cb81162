//! Future and progress primitives the resolution engine is built on

pub mod listenable;
pub mod progress;

pub use listenable::{FutureError, ListenableFuture, Outcome, Promise};
pub use progress::{NoProgress, ProgressIndicator, WaitOptions, wait_under_progress};
