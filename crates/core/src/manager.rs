//! Run manager
//!
//! Owns the configurations created from UI actions. An action reuses a configuration that is
//! already what it would create; a sync invalidates cached contexts, refreshes target kinds and
//! drops configurations whose pending setup ended without a target.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::configuration::RunConfiguration;
use crate::error::Result;
use crate::lookup::TargetLookup;
use crate::producer::{RunConfigurationProducer, UiContext};

/// What a sync did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub sync_generation: u64,
    pub refreshed: usize,
    /// Names of the configurations that were removed
    pub removed: Vec<String>,
}

pub struct RunManager {
    producer: Arc<RunConfigurationProducer>,
    lookup: Arc<dyn TargetLookup>,
    configurations: Mutex<Vec<RunConfiguration>>,
}

impl std::fmt::Debug for RunManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunManager")
            .field("producer", &self.producer)
            .field("configurations", &self.configurations.lock().len())
            .finish()
    }
}

impl RunManager {
    pub fn new(producer: Arc<RunConfigurationProducer>, lookup: Arc<dyn TargetLookup>) -> Self {
        Self {
            producer,
            lookup,
            configurations: Mutex::new(Vec::new()),
        }
    }

    pub fn producer(&self) -> &RunConfigurationProducer {
        &self.producer
    }

    pub fn configurations(&self) -> Vec<RunConfiguration> {
        self.configurations.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.configurations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a configuration created elsewhere, e.g. restored from disk.
    pub fn add(&self, config: RunConfiguration) {
        self.configurations.lock().push(config);
    }

    pub fn remove(&self, config: &RunConfiguration) -> bool {
        let mut configurations = self.configurations.lock();
        let before = configurations.len();
        configurations.retain(|existing| !existing.ptr_eq(config));
        configurations.len() != before
    }

    /// An existing configuration equivalent to what `ui` produces, or a new one.
    ///
    /// A reused configuration whose pending setup was cancelled or failed is set up again from
    /// the fresh context, so the retry doesn't inherit the dead owner. Returns `None` when no
    /// provider has a context for `ui`.
    pub fn find_or_create(&self, ui: &UiContext) -> Result<Option<RunConfiguration>> {
        for config in self.configurations() {
            if !self.producer.is_config_from_context(&config, ui)? {
                continue;
            }
            if config
                .pending_context()
                .is_some_and(|owner| owner.is_failed())
            {
                tracing::debug!("retrying setup of configuration '{}'", config.name());
                self.producer.setup_from_context(&config, ui)?;
            } else {
                tracing::debug!("reusing configuration '{}'", config.name());
            }
            return Ok(Some(config));
        }

        let Some((config, _context)) = self.producer.create_configuration(ui)? else {
            return Ok(None);
        };
        tracing::debug!("created configuration '{}'", config.name());
        self.add(config.clone());
        Ok(Some(config))
    }

    /// Called after every sync of the build graph.
    pub fn on_sync(&self) -> SyncReport {
        let sync_generation = self.producer.cache().bump_generation();
        let configurations = self.configurations();

        for config in &configurations {
            // Completion applies the kind; nothing to wait for here
            let _ = config.update_target_kind(self.lookup.as_ref());
        }

        let failed: Vec<RunConfiguration> = configurations
            .iter()
            .filter(|config| config.pending_setup_failed())
            .cloned()
            .collect();
        let mut removed = Vec::new();
        for config in failed {
            if self.remove(&config) {
                tracing::debug!("removing configuration '{}' without a target", config.name());
                removed.push(config.name());
            }
        }

        SyncReport {
            sync_generation,
            refreshed: configurations.len(),
            removed,
        }
    }
}
