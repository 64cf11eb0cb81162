use anyhow::Result;
use std::path::Path;

use runtarget_core::ResolverSettings;

use crate::display::print_targets;
use crate::host::TargetIndex;

pub fn targets_command(index_path: &Path, json: bool) -> Result<()> {
    let index = TargetIndex::load(index_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }

    let settings = ResolverSettings::discover(&std::env::current_dir()?)?;
    print_targets(&index, &settings.kind_registry());
    Ok(())
}
