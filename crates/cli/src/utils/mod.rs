pub mod parser;
pub mod workspace;

pub use parser::parse_filepath_with_line;
pub use workspace::{absolute_path, find_workspace_root};
