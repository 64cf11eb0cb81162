//! Settings layering
//!
//! Implements the hierarchy filesystem root -> ... -> working directory. Scalar fields are
//! replaced by the nearer file; extra kinds are merged by kind name, the nearer entry winning.

use super::ResolverSettings;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = ".runtarget.json";

/// Collects and merges the settings files that apply to a directory.
#[derive(Debug, Default)]
pub struct SettingsMerger {
    /// Loaded layers, root first
    layers: Vec<(PathBuf, ResolverSettings)>,
}

impl SettingsMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every settings file from `start_dir` up to the filesystem root.
    pub fn load_for_dir(&mut self, start_dir: &Path) -> Result<()> {
        for path in Self::find_settings_files(start_dir) {
            debug!("Loading settings from: {:?}", path);
            let settings = ResolverSettings::load_from_file(&path)?;
            self.layers.push((path, settings));
        }
        Ok(())
    }

    /// Settings files visible from `start_dir`, root first
    pub fn find_settings_files(start_dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = start_dir
            .ancestors()
            .map(|dir| dir.join(SETTINGS_FILE_NAME))
            .filter(|path| path.is_file())
            .collect();
        found.reverse();
        found
    }

    pub fn loaded_paths(&self) -> Vec<&Path> {
        self.layers.iter().map(|(path, _)| path.as_path()).collect()
    }

    pub fn merged(&self) -> ResolverSettings {
        let mut merged = ResolverSettings::default();
        for (_, layer) in &self.layers {
            merged.merge_with(layer.clone());
        }
        merged
    }
}

impl ResolverSettings {
    /// Overlays every field `other` sets.
    pub fn merge_with(&mut self, other: ResolverSettings) {
        if other.build_system_name.is_some() {
            self.build_system_name = other.build_system_name;
        }
        if other.max_unwrap_depth.is_some() {
            self.max_unwrap_depth = other.max_unwrap_depth;
        }
        if other.context_cache_capacity.is_some() {
            self.context_cache_capacity = other.context_cache_capacity;
        }
        if other.progress_poll_interval_ms.is_some() {
            self.progress_poll_interval_ms = other.progress_poll_interval_ms;
        }
        if other.resolve_timeout_ms.is_some() {
            self.resolve_timeout_ms = other.resolve_timeout_ms;
        }
        if other.test_filter_flag.is_some() {
            self.test_filter_flag = other.test_filter_flag;
        }
        if other.test_env_flag.is_some() {
            self.test_env_flag = other.test_env_flag;
        }
        // Priority order is a whole; never interleave two orders
        if other.heuristics.is_some() {
            self.heuristics = other.heuristics;
        }
        for entry in other.extra_kinds {
            self.extra_kinds.retain(|existing| existing.kind != entry.kind);
            self.extra_kinds.push(entry);
        }
    }

    /// Merged settings for `start_dir`; defaults if no file is found.
    pub fn discover(start_dir: &Path) -> Result<Self> {
        let mut merger = SettingsMerger::new();
        merger.load_for_dir(start_dir)?;
        Ok(merger.merged())
    }
}
