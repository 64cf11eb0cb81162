pub mod analyze;
pub mod resolve;
pub mod targets;

pub use analyze::analyze_command;
pub use resolve::{ResolveOptions, resolve_command};
pub use targets::targets_command;

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::debug;

use runtarget_core::locate::locate;
use runtarget_core::types::SourceContext;
use runtarget_core::ResolverSettings;

use crate::utils::{absolute_path, find_workspace_root, parse_filepath_with_line};

/// A `file[:line]` argument turned into a source context
pub struct LocatedSource {
    pub workspace: PathBuf,
    pub source: SourceContext,
    pub settings: ResolverSettings,
}

pub fn locate_source(filepath_arg: &str, workspace: Option<&Path>) -> Result<LocatedSource> {
    let (filepath, line) = parse_filepath_with_line(filepath_arg);
    let file = absolute_path(Path::new(&filepath))?;
    if !file.exists() {
        return Err(anyhow!("File not found: {}", file.display()));
    }

    let workspace = match workspace {
        Some(dir) => absolute_path(dir)?,
        None => find_workspace_root(&file)?,
    };
    debug!("workspace root: {}", workspace.display());

    let settings_dir = file.parent().unwrap_or(&workspace);
    let settings = ResolverSettings::discover(settings_dir)?;
    let source = locate(&workspace, &file, line)?;

    Ok(LocatedSource {
        workspace,
        source,
        settings,
    })
}
