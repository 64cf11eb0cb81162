use std::collections::BTreeSet;
use std::sync::Arc;

use super::{
    ContextDetails, FlagModification, FlagNames, KnownContext, PendingContext,
    RunConfigurationContext, web_test_context,
};
use crate::context::pending::DEFAULT_MAX_UNWRAP_DEPTH;
use crate::error::{Error, Result};
use crate::future::{ListenableFuture, Promise};
use crate::lookup::TargetLookup;
use crate::types::{BuildCommand, ExecutorType, KindRegistry, SourceElement, TargetInfo};

/// Assembles a pending test context from either a target future or a context future.
///
/// With a target future, a missing target fails the context with "No {build system} target
/// found." and, when a wrapper lookup is configured, the target is swapped for its web test
/// wrappers. Exactly one of the two futures must be set.
pub struct TestContextBuilder {
    element: SourceElement,
    executors: BTreeSet<ExecutorType>,
    command: BuildCommand,
    target_future: Option<ListenableFuture<Option<TargetInfo>>>,
    context_future: Option<ListenableFuture<RunConfigurationContext>>,
    flags: Vec<FlagModification>,
    description: Option<String>,
    flag_names: FlagNames,
    build_system: String,
    max_depth: usize,
    wrappers: Option<(Arc<dyn TargetLookup>, Arc<KindRegistry>)>,
}

impl TestContextBuilder {
    pub fn new(element: SourceElement, executors: BTreeSet<ExecutorType>) -> Self {
        Self {
            element,
            executors,
            command: BuildCommand::Test,
            target_future: None,
            context_future: None,
            flags: Vec::new(),
            description: None,
            flag_names: FlagNames::default(),
            build_system: "Bazel".to_string(),
            max_depth: DEFAULT_MAX_UNWRAP_DEPTH,
            wrappers: None,
        }
    }

    pub fn command(mut self, command: BuildCommand) -> Self {
        self.command = command;
        self
    }

    pub fn target(mut self, target: TargetInfo) -> Self {
        self.target_future = Some(ListenableFuture::ready(Some(target)));
        self
    }

    pub fn target_future(mut self, future: ListenableFuture<Option<TargetInfo>>) -> Self {
        self.target_future = Some(future);
        self
    }

    pub fn context_future(mut self, future: ListenableFuture<RunConfigurationContext>) -> Self {
        self.context_future = Some(future);
        self
    }

    pub fn test_filter(mut self, filter: Option<&str>) -> Self {
        if let Some(filter) = filter {
            self.flags.push(self.flag_names.test_filter(Some(filter)));
        }
        self
    }

    pub fn test_env(mut self, env: impl Into<String>) -> Self {
        self.flags.push(self.flag_names.test_env(env));
        self
    }

    pub fn flag(mut self, modification: FlagModification) -> Self {
        self.flags.push(modification);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Must be set before any filter or env flag is added.
    pub fn flag_names(mut self, names: FlagNames) -> Self {
        self.flag_names = names;
        self
    }

    pub fn build_system(mut self, name: impl Into<String>) -> Self {
        self.build_system = name.into();
        self
    }

    pub fn max_unwrap_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Looks up web test wrappers of the resolved target.
    pub fn web_test_wrappers(mut self, lookup: Arc<dyn TargetLookup>, kinds: Arc<KindRegistry>) -> Self {
        self.wrappers = Some((lookup, kinds));
        self
    }

    /// Context details as they will be attached to every context this builder produces.
    ///
    /// Test commands always carry a test filter modification, so a context without a filter
    /// strips stale filters from a reused configuration and doesn't match filtered ones.
    pub fn details(&self) -> ContextDetails {
        let mut flags = self.flags.clone();
        if self.command == BuildCommand::Test && !flags.iter().any(FlagModification::is_test_filter)
        {
            flags.push(self.flag_names.test_filter(None));
        }
        ContextDetails {
            element: self.element.clone(),
            command: self.command,
            flags,
            description: self.description.clone(),
            executors: self.executors.clone(),
        }
    }

    pub fn build(self) -> Result<RunConfigurationContext> {
        let details = self.details();
        match (self.target_future, self.context_future) {
            (None, Some(context_future)) => Ok(PendingContext::new(
                details,
                context_future,
                "Resolving test context",
                self.max_depth,
            )
            .into_settled()),
            (Some(target_future), None) => {
                let message = format!("Searching for {} target", self.build_system);
                let not_found = format!("No {} target found.", self.build_system);
                let stage = TargetStage {
                    details: details.clone(),
                    wrappers: self.wrappers,
                    progress_message: message.clone(),
                    max_depth: self.max_depth,
                };
                let context_future = target_future.and_then(move |target| match target {
                    Some(target) => ListenableFuture::ready(stage.context_for(target)),
                    None => ListenableFuture::failed(Error::NoTargetFound(not_found)),
                });
                Ok(PendingContext::new(details, context_future, message, self.max_depth)
                    .into_settled())
            }
            (Some(_), Some(_)) => Err(Error::ConfigError(
                "a test context takes a target future or a context future, not both".to_string(),
            )),
            (None, None) => Err(Error::ConfigError(
                "a test context needs a target future or a context future".to_string(),
            )),
        }
    }
}

/// Turns a found target into a context, swapping in web test wrappers when configured.
struct TargetStage {
    details: ContextDetails,
    wrappers: Option<(Arc<dyn TargetLookup>, Arc<KindRegistry>)>,
    progress_message: String,
    max_depth: usize,
}

impl TargetStage {
    fn context_for(self, target: TargetInfo) -> RunConfigurationContext {
        let known = KnownContext::new(target, self.details.clone());
        let Some((lookup, kinds)) = self.wrappers else {
            return known.into();
        };

        let label = known.target().label.clone();
        let promise = Promise::new();
        let with_wrappers = promise.future();
        lookup.wrappers_of(&label).on_complete(move |outcome| {
            let wrappers = match outcome {
                Ok(wrappers) => wrappers
                    .into_iter()
                    .filter(|wrapper| kinds.is_web_test(&wrapper.kind))
                    .collect(),
                Err(error) => {
                    tracing::debug!("wrapper lookup for {} failed: {}", label, error);
                    Vec::new()
                }
            };
            promise.complete(web_test_context(known, wrappers));
        });

        match with_wrappers.try_outcome() {
            Some(Ok(context)) => context,
            _ => PendingContext::new(
                self.details,
                with_wrappers,
                self.progress_message,
                self.max_depth,
            )
            .into(),
        }
    }
}
