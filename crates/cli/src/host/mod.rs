//! Host side collaborators for a terminal session

pub mod chooser;
pub mod index;
pub mod progress;
pub mod reporter;

pub use chooser::{FixedChooser, PromptChooser};
pub use index::{IndexLookup, TargetIndex};
pub use progress::TerminalProgress;
pub use reporter::StderrReporter;
