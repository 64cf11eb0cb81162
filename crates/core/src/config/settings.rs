use crate::{
    context::FlagNames,
    error::{Error, Result},
    future::WaitOptions,
    heuristics::{HeuristicId, HeuristicRegistry},
    types::{KindEntry, KindRegistry},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BUILD_SYSTEM_NAME: &str = "Bazel";
pub const DEFAULT_CONTEXT_CACHE_CAPACITY: usize = 128;
pub const DEFAULT_PROGRESS_POLL_INTERVAL_MS: u64 = 25;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResolverSettings {
    /// Shown in generated names and messages, e.g. "Bazel" or "Blaze"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_system_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unwrap_depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_cache_capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_poll_interval_ms: Option<u64>,
    /// No timeout unless set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_filter_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_env_flag: Option<String>,
    /// Heuristic priority order, highest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristics: Option<Vec<HeuristicId>>,
    /// Appended to the built-in kind table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_kinds: Vec<KindEntry>,
}

impl ResolverSettings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize settings: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Rejects values the resolver can't work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_unwrap_depth == Some(0) {
            return Err(Error::ConfigError("max_unwrap_depth must be at least 1".into()));
        }
        if self.context_cache_capacity == Some(0) {
            return Err(Error::ConfigError(
                "context_cache_capacity must be at least 1".into(),
            ));
        }
        if self.progress_poll_interval_ms == Some(0) {
            return Err(Error::ConfigError(
                "progress_poll_interval_ms must be at least 1".into(),
            ));
        }
        if let Some(order) = &self.heuristics {
            let mut seen = HashSet::new();
            if let Some(duplicate) = order.iter().find(|id| !seen.insert(**id)) {
                return Err(Error::ConfigError(format!(
                    "heuristic {:?} listed more than once",
                    duplicate
                )));
            }
        }
        for flag in [&self.test_filter_flag, &self.test_env_flag].into_iter().flatten() {
            if !flag.starts_with("--") {
                return Err(Error::ConfigError(format!(
                    "flag name '{flag}' must start with --"
                )));
            }
        }
        Ok(())
    }

    pub fn build_system_name(&self) -> &str {
        self.build_system_name
            .as_deref()
            .unwrap_or(DEFAULT_BUILD_SYSTEM_NAME)
    }

    pub fn max_unwrap_depth(&self) -> usize {
        self.max_unwrap_depth
            .unwrap_or(crate::context::DEFAULT_MAX_UNWRAP_DEPTH)
    }

    pub fn context_cache_capacity(&self) -> usize {
        self.context_cache_capacity
            .unwrap_or(DEFAULT_CONTEXT_CACHE_CAPACITY)
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_millis(
                self.progress_poll_interval_ms
                    .unwrap_or(DEFAULT_PROGRESS_POLL_INTERVAL_MS),
            ),
            timeout: self.resolve_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn flag_names(&self) -> FlagNames {
        let defaults = FlagNames::default();
        FlagNames {
            test_filter: self
                .test_filter_flag
                .clone()
                .unwrap_or(defaults.test_filter),
            test_env: self.test_env_flag.clone().unwrap_or(defaults.test_env),
        }
    }

    pub fn heuristic_order(&self) -> Vec<HeuristicId> {
        self.heuristics
            .clone()
            .unwrap_or_else(HeuristicId::default_order)
    }

    pub fn heuristic_registry(&self) -> HeuristicRegistry {
        HeuristicRegistry::from_order(&self.heuristic_order())
    }

    pub fn kind_registry(&self) -> KindRegistry {
        KindRegistry::with_extras(&self.extra_kinds)
    }
}
