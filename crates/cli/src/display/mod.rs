pub mod formatter;

pub use formatter::{print_configuration, print_source_context, print_targets};
