use anyhow::Result;
use std::path::Path;
use tracing::debug;

use super::locate_source;
use crate::display::print_source_context;

pub fn analyze_command(filepath_arg: &str, workspace: Option<&Path>, json: bool) -> Result<()> {
    debug!("Analyzing: {}", filepath_arg);
    let located = locate_source(filepath_arg, workspace)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&located.source)?);
    } else {
        println!("🔍 Analyzing: {filepath_arg}");
        println!("{}", "=".repeat(80));
        print_source_context(&located.source, &located.settings.kind_registry());
    }
    Ok(())
}
