use std::sync::Arc;

use super::{ContextProvider, ProviderServices};
use crate::context::{ContextDetails, KnownContext, PendingContext, RunConfigurationContext};
use crate::error::{Error, Result};
use crate::future::ListenableFuture;
use crate::producer::UiContext;
use crate::types::{BuildCommand, RuleType, TargetInfo};

/// Fallback path for sources with an entry point: runs the binary target built from them.
pub struct BinaryContextProvider {
    services: ProviderServices,
}

impl BinaryContextProvider {
    pub fn new(services: ProviderServices) -> Self {
        Self { services }
    }
}

impl ContextProvider for BinaryContextProvider {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn context(&self, ui: &UiContext) -> Result<Option<RunConfigurationContext>> {
        let source = &ui.source;
        if !source.has_entry_point {
            return Ok(None);
        }

        let details = ContextDetails::new(source.element.clone(), BuildCommand::Run);
        let kinds = Arc::clone(&self.services.kinds);
        let heuristics = Arc::clone(&self.services.heuristics);
        let captured = source.clone();
        let for_target = details.clone();
        let not_found = self.services.not_found_message();

        let context = self
            .services
            .lookup
            .targets_for_source(source)
            .and_then(move |candidates| {
                let binaries: Vec<TargetInfo> = candidates
                    .into_iter()
                    .filter(|t| kinds.guess_rule_type(&t.kind) == RuleType::Binary)
                    .collect();
                match heuristics.choose_target(&captured, &binaries) {
                    Some(target) => ListenableFuture::ready(RunConfigurationContext::from(
                        KnownContext::new(target, for_target),
                    )),
                    None => ListenableFuture::failed(Error::NoTargetFound(not_found)),
                }
            });

        Ok(Some(
            PendingContext::new(
                details,
                context,
                self.services.progress_message(),
                self.services.max_unwrap_depth,
            )
            .into_settled(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverSettings;
    use crate::lookup::TargetLookup;
    use crate::types::{Label, SourceContext, SourceElement};

    struct Table(Vec<TargetInfo>);

    impl TargetLookup for Table {
        fn targets_for_source(&self, _source: &SourceContext) -> ListenableFuture<Vec<TargetInfo>> {
            ListenableFuture::ready(self.0.clone())
        }

        fn target_info(&self, _label: &Label) -> ListenableFuture<Option<TargetInfo>> {
            ListenableFuture::ready(None)
        }
    }

    fn provider(targets: Vec<TargetInfo>) -> BinaryContextProvider {
        BinaryContextProvider::new(ProviderServices::new(
            Arc::new(Table(targets)),
            &ResolverSettings::default(),
        ))
    }

    fn main_file() -> UiContext {
        UiContext::new(
            SourceContext::new(SourceElement::File {
                path: "app/main.go".into(),
            })
            .with_workspace_path("app/main.go")
            .with_entry_point(),
        )
    }

    #[test]
    fn test_only_entry_points() {
        let provider = provider(Vec::new());
        let ui = UiContext::new(SourceContext::new(SourceElement::File {
            path: "app/util.go".into(),
        }));
        assert!(provider.context(&ui).unwrap().is_none());
    }

    #[test]
    fn test_binary_candidate_runs() {
        let provider = provider(vec![
            TargetInfo::new(Label::new("app", "util"), "go_library"),
            TargetInfo::new(Label::new("app", "app"), "go_binary"),
        ]);
        // The lookup answered right away: no pending stage left
        match provider.context(&main_file()).unwrap().unwrap() {
            RunConfigurationContext::Known(known) => {
                assert_eq!(known.target().label.to_string(), "//app:app");
                assert_eq!(known.details().command, BuildCommand::Run);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_binary_fails_with_message() {
        let provider = provider(vec![TargetInfo::new(Label::new("app", "util"), "go_library")]);
        let context = provider.context(&main_file()).unwrap().unwrap();
        assert!(context.is_failed());

        let RunConfigurationContext::Pending(pending) = context else {
            panic!("expected a pending context");
        };
        match pending.future().try_outcome() {
            Some(Err(error)) => match error.into_resolution_error() {
                Error::NoTargetFound(message) => assert_eq!(message, "No Bazel target found."),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }
}
