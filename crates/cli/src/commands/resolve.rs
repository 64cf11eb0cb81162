use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use runtarget_core::{
    ResolveEnv, RunConfigurationProducer, RunManager, TargetChooser, TargetLookup, UiContext,
};

use super::locate_source;
use crate::display::print_configuration;
use crate::host::{FixedChooser, IndexLookup, PromptChooser, StderrReporter, TargetIndex, TerminalProgress};

/// Exit code for a resolution the user dismissed
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub filepath: String,
    pub index: PathBuf,
    pub workspace: Option<PathBuf>,
    /// 1-based candidate to pick when several targets qualify
    pub choose: Option<usize>,
    pub latency: Duration,
    pub json: bool,
}

pub fn resolve_command(options: &ResolveOptions) -> Result<()> {
    let located = locate_source(&options.filepath, options.workspace.as_deref())?;
    let settings = located.settings;

    let index = TargetIndex::load(&options.index)?;
    let lookup: Arc<dyn TargetLookup> = Arc::new(IndexLookup::new(index, options.latency));
    let producer = Arc::new(RunConfigurationProducer::from_settings(
        Arc::clone(&lookup),
        &settings,
    ));
    let manager = RunManager::new(Arc::clone(&producer), lookup);

    let ui = UiContext::new(located.source);
    let Some(config) = manager.find_or_create(&ui)? else {
        return Err(anyhow!(
            "Nothing to run with {} at {}",
            producer.build_system(),
            display_path(&located.workspace, &ui)
        ));
    };
    if config.is_pending() {
        debug!("configuration '{}' is waiting for its target", config.name());
    }

    let chooser: Box<dyn TargetChooser> = match options.choose {
        Some(position) => Box::new(FixedChooser::new(position)),
        None => Box::new(PromptChooser),
    };
    let progress = TerminalProgress::new(options.json);
    let env = ResolveEnv {
        progress: &progress,
        chooser: chooser.as_ref(),
        wait: settings.wait_options(),
    };
    let reporter = StderrReporter::new();

    match producer.prepare_for_launch(&config, &env, &reporter) {
        Ok(()) => {}
        Err(error) if error.is_silent() => {
            debug!("resolution ended silently: {}", error);
            eprintln!("Resolution cancelled");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(_) if reporter.reported() => std::process::exit(1),
        Err(error) => return Err(error.into()),
    }

    if options.json {
        println!("{}", config.to_json()?);
    } else {
        print_configuration(&config);
    }
    Ok(())
}

fn display_path(workspace: &Path, ui: &UiContext) -> String {
    workspace.join(ui.source.path()).display().to_string()
}
