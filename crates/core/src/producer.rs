//! Run configuration producer
//!
//! Glue between a UI action and a run configuration: polls the providers (through the context
//! cache), applies the winning context, and answers whether an existing configuration already
//! is what the action would create. Setup is strict while the reuse check is loose: names and
//! extra user flags never make a configuration look different.

use std::sync::Arc;

use crate::configuration::RunConfiguration;
use crate::config::ResolverSettings;
use crate::context::{ResolveEnv, RunConfigurationContext};
use crate::error::{ErrorReporter, Result, report};
use crate::lookup::TargetLookup;
use crate::providers::{ContextCache, ProviderRegistry, ProviderServices};
use crate::types::SourceContext;

/// The action context a producer works from
#[derive(Debug, Clone)]
pub struct UiContext {
    pub source: SourceContext,
    /// Pre-selected test nodes; they become the test filter
    pub selected_tests: Vec<String>,
    /// Configuration the action was invoked from. When set, only it can be reused.
    pub existing: Option<RunConfiguration>,
}

impl UiContext {
    pub fn new(source: SourceContext) -> Self {
        Self {
            source,
            selected_tests: Vec::new(),
            existing: None,
        }
    }

    pub fn with_selected_tests<I, S>(mut self, tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tests = tests.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_existing(mut self, config: RunConfiguration) -> Self {
        self.existing = Some(config);
        self
    }
}

pub struct RunConfigurationProducer {
    providers: ProviderRegistry,
    cache: Arc<ContextCache>,
    build_system: String,
}

impl std::fmt::Debug for RunConfigurationProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfigurationProducer")
            .field("providers", &self.providers)
            .field("build_system", &self.build_system)
            .finish()
    }
}

impl RunConfigurationProducer {
    pub fn new(
        providers: ProviderRegistry,
        cache: Arc<ContextCache>,
        build_system: impl Into<String>,
    ) -> Self {
        Self {
            providers,
            cache,
            build_system: build_system.into(),
        }
    }

    /// Default providers over `lookup`, configured from `settings`
    pub fn from_settings(lookup: Arc<dyn TargetLookup>, settings: &ResolverSettings) -> Self {
        let services = ProviderServices::new(lookup, settings);
        Self::new(
            ProviderRegistry::with_defaults(&services),
            Arc::new(ContextCache::new(settings.context_cache_capacity())),
            settings.build_system_name(),
        )
    }

    pub fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    pub fn build_system(&self) -> &str {
        &self.build_system
    }

    /// The first provider's context for `ui`, memoized per element, edit and sync.
    pub fn find_context(&self, ui: &UiContext) -> Result<Option<RunConfigurationContext>> {
        self.cache
            .get_or_compute(ui, || self.providers.find_context(ui))
    }

    /// A new configuration set up from `ui`, or `None` if no provider applies or setup failed.
    pub fn create_configuration(
        &self,
        ui: &UiContext,
    ) -> Result<Option<(RunConfiguration, RunConfigurationContext)>> {
        let Some(context) = self.find_context(ui)? else {
            return Ok(None);
        };
        let config = RunConfiguration::new(self.build_system.as_str());
        if !context.setup_run_configuration(&config) {
            tracing::debug!(
                "setup from context failed for {}",
                context.source_element().element_key()
            );
            return Ok(None);
        }
        Ok(Some((config, context)))
    }

    pub fn setup_from_context(&self, config: &RunConfiguration, ui: &UiContext) -> Result<bool> {
        match self.find_context(ui)? {
            Some(context) => Ok(context.setup_run_configuration(config)),
            None => Ok(false),
        }
    }

    /// Whether `config` already is the configuration `ui` would produce.
    pub fn is_config_from_context(&self, config: &RunConfiguration, ui: &UiContext) -> Result<bool> {
        if let Some(existing) = &ui.existing {
            if !existing.ptr_eq(config) {
                return Ok(false);
            }
        }
        match self.find_context(ui)? {
            Some(context) => Ok(context.matches_run_configuration(config)),
            None => Ok(false),
        }
    }

    /// Finishes whatever context still owns `config` and validates the result.
    ///
    /// Resolution failures go to `reporter` (cancellation and supersession stay silent) and are
    /// returned as well, so the caller can abort the launch.
    pub fn prepare_for_launch(
        &self,
        config: &RunConfiguration,
        env: &ResolveEnv<'_>,
        reporter: &dyn ErrorReporter,
    ) -> Result<()> {
        if let Some(owner) = config.pending_context() {
            if let Err(error) = owner.resolve(config, env) {
                report(&error, reporter);
                return Err(error);
            }
        }
        config.check_configuration()
    }
}
