use super::{ContextProvider, ProviderServices};
use crate::context::{ContextDetails, KnownContext, RunConfigurationContext};
use crate::error::Result;
use crate::producer::UiContext;
use crate::types::{BuildCommand, ExecutorType, SourceElement, TargetInfo};

/// Fast path: the rule call under the cursor in a BUILD file.
///
/// Binaries run, tests test, and anything else (libraries, unknown rules) has no context.
pub struct BuildFileRuleProvider {
    services: ProviderServices,
}

impl BuildFileRuleProvider {
    pub fn new(services: ProviderServices) -> Self {
        Self { services }
    }
}

impl ContextProvider for BuildFileRuleProvider {
    fn name(&self) -> &'static str {
        "build_file_rule"
    }

    fn context(&self, ui: &UiContext) -> Result<Option<RunConfigurationContext>> {
        let element = &ui.source.element;
        let SourceElement::BuildRule {
            rule_kind, label, ..
        } = element
        else {
            return Ok(None);
        };

        let rule_type = self.services.kinds.guess_rule_type(rule_kind);
        let Some(command) = BuildCommand::for_rule_type(rule_type) else {
            tracing::debug!("rule {} ({}) is not runnable", label, rule_kind);
            return Ok(None);
        };

        let mut details = ContextDetails::new(element.clone(), command);
        details.executors = ExecutorType::all();
        if command == BuildCommand::Test {
            details.flags.push(self.services.flag_names.test_filter(None));
        }
        let target = TargetInfo::new(label.clone(), rule_kind.clone());
        Ok(Some(KnownContext::new(target, details).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverSettings;
    use crate::future::ListenableFuture;
    use crate::lookup::TargetLookup;
    use crate::types::{Label, SourceContext};
    use std::path::PathBuf;
    use std::sync::Arc;

    struct NoLookup;

    impl TargetLookup for NoLookup {
        fn targets_for_source(&self, _source: &SourceContext) -> ListenableFuture<Vec<TargetInfo>> {
            ListenableFuture::ready(Vec::new())
        }

        fn target_info(&self, _label: &Label) -> ListenableFuture<Option<TargetInfo>> {
            ListenableFuture::ready(None)
        }
    }

    fn provider() -> BuildFileRuleProvider {
        BuildFileRuleProvider::new(ProviderServices::new(
            Arc::new(NoLookup),
            &ResolverSettings::default(),
        ))
    }

    fn rule(kind: &str, name: &str) -> UiContext {
        UiContext::new(SourceContext::new(SourceElement::BuildRule {
            build_file: PathBuf::from("pkg/BUILD"),
            rule_kind: kind.to_string(),
            label: Label::new("pkg", name),
        }))
    }

    #[test]
    fn test_command_follows_rule_type() {
        let provider = provider();

        match provider.context(&rule("java_test", "FooTest")).unwrap() {
            Some(RunConfigurationContext::Known(known)) => {
                assert_eq!(known.details().command, BuildCommand::Test);
                assert_eq!(known.target().label.to_string(), "//pkg:FooTest");
                assert_eq!(known.details().executors, ExecutorType::all());
            }
            other => panic!("unexpected {other:?}"),
        }

        match provider.context(&rule("_transition_py_binary", "tool")).unwrap() {
            Some(RunConfigurationContext::Known(known)) => {
                assert_eq!(known.details().command, BuildCommand::Run);
                assert!(known.details().flags.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_libraries_and_sources_are_skipped() {
        let provider = provider();
        assert!(provider.context(&rule("java_library", "lib")).unwrap().is_none());
        assert!(provider.context(&rule("filegroup", "srcs")).unwrap().is_none());

        let source = UiContext::new(SourceContext::new(SourceElement::File {
            path: PathBuf::from("pkg/Foo.java"),
        }));
        assert!(provider.context(&source).unwrap().is_none());
    }
}
