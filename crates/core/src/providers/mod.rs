//! Context providers
//!
//! A [`ContextProvider`] looks at a UI action and proposes at most one context. Providers are
//! polled in registry order and the first answer wins; answers are never merged. Providers must
//! be cheap: anything that needs a build-tool query goes through the [`TargetLookup`] and comes
//! back as a pending context.

use std::sync::Arc;

use crate::config::ResolverSettings;
use crate::context::{FlagNames, RunConfigurationContext};
use crate::error::Result;
use crate::heuristics::HeuristicRegistry;
use crate::lookup::TargetLookup;
use crate::producer::UiContext;
use crate::types::KindRegistry;

mod binary;
mod build_file;
mod cache;
mod test_source;

pub use binary::BinaryContextProvider;
pub use build_file::BuildFileRuleProvider;
pub use cache::ContextCache;
pub use test_source::TestSourceProvider;

pub trait ContextProvider: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &'static str;

    /// The context for `ui`, or `None` to let the next provider try.
    fn context(&self, ui: &UiContext) -> Result<Option<RunConfigurationContext>>;
}

/// Collaborators and settings shared by the built-in providers
#[derive(Clone)]
pub struct ProviderServices {
    pub lookup: Arc<dyn TargetLookup>,
    pub kinds: Arc<KindRegistry>,
    pub heuristics: Arc<HeuristicRegistry>,
    pub flag_names: FlagNames,
    pub build_system: String,
    pub max_unwrap_depth: usize,
}

impl ProviderServices {
    pub fn new(lookup: Arc<dyn TargetLookup>, settings: &ResolverSettings) -> Self {
        Self {
            lookup,
            kinds: Arc::new(settings.kind_registry()),
            heuristics: Arc::new(settings.heuristic_registry()),
            flag_names: settings.flag_names(),
            build_system: settings.build_system_name().to_string(),
            max_unwrap_depth: settings.max_unwrap_depth(),
        }
    }

    pub fn with_heuristics(mut self, heuristics: HeuristicRegistry) -> Self {
        self.heuristics = Arc::new(heuristics);
        self
    }

    pub(crate) fn not_found_message(&self) -> String {
        format!("No {} target found.", self.build_system)
    }

    pub(crate) fn progress_message(&self) -> String {
        format!("Searching for {} target", self.build_system)
    }
}

/// Ordered, read-only list of providers
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ContextProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build file rules first, then test sources, then entry points.
    pub fn with_defaults(services: &ProviderServices) -> Self {
        Self::new()
            .with(Arc::new(BuildFileRuleProvider::new(services.clone())))
            .with(Arc::new(TestSourceProvider::new(services.clone())))
            .with(Arc::new(BinaryContextProvider::new(services.clone())))
    }

    /// Appends `provider` at the lowest priority.
    pub fn register(&mut self, provider: Arc<dyn ContextProvider>) {
        self.providers.push(provider);
    }

    pub fn with(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn find_context(&self, ui: &UiContext) -> Result<Option<RunConfigurationContext>> {
        for provider in &self.providers {
            if let Some(context) = provider.context(ui)? {
                tracing::debug!(
                    "provider {} produced a context for {}",
                    provider.name(),
                    ui.source.element.element_key()
                );
                return Ok(Some(context));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::KnownContext;
    use crate::context::ContextDetails;
    use crate::error::Error;
    use crate::types::{BuildCommand, Label, SourceContext, SourceElement, TargetInfo};
    use parking_lot::Mutex;
    use std::path::PathBuf;

    struct Fixed {
        name: &'static str,
        answer: Option<&'static str>,
        calls: Mutex<usize>,
    }

    impl Fixed {
        fn new(name: &'static str, answer: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer,
                calls: Mutex::new(0),
            })
        }
    }

    impl ContextProvider for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn context(&self, ui: &UiContext) -> Result<Option<RunConfigurationContext>> {
            *self.calls.lock() += 1;
            Ok(self.answer.map(|target| {
                KnownContext::new(
                    TargetInfo::new(Label::new("pkg", target), "java_test"),
                    ContextDetails::new(ui.source.element.clone(), BuildCommand::Test),
                )
                .into()
            }))
        }
    }

    struct Failing;

    impl ContextProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn context(&self, _ui: &UiContext) -> Result<Option<RunConfigurationContext>> {
            Err(Error::Other("provider blew up".into()))
        }
    }

    fn ui() -> UiContext {
        UiContext::new(SourceContext::new(SourceElement::File {
            path: PathBuf::from("pkg/FooTest.java"),
        }))
    }

    #[test]
    fn test_first_non_null_wins() {
        let empty = Fixed::new("empty", None);
        let first = Fixed::new("first", Some("A"));
        let second = Fixed::new("second", Some("B"));
        let registry = ProviderRegistry::new()
            .with(empty.clone())
            .with(first.clone())
            .with(second.clone());

        match registry.find_context(&ui()).unwrap() {
            Some(RunConfigurationContext::Known(known)) => {
                assert_eq!(known.target().label.to_string(), "//pkg:A")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*empty.calls.lock(), 1);
        assert_eq!(*second.calls.lock(), 0);
        assert_eq!(registry.names(), vec!["empty", "first", "second"]);
    }

    #[test]
    fn test_provider_errors_propagate() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(Failing))
            .with(Fixed::new("never", Some("A")));
        assert!(registry.find_context(&ui()).is_err());
    }

    #[test]
    fn test_no_provider_answers() {
        let registry = ProviderRegistry::new().with(Fixed::new("empty", None));
        assert!(registry.find_context(&ui()).unwrap().is_none());
        assert!(ProviderRegistry::new().find_context(&ui()).unwrap().is_none());
    }
}
