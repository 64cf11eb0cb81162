//! Run configuration contexts
//!
//! A [`RunConfigurationContext`] is what a provider proposes for a UI action. It is one of:
//!
//! - [`KnownContext`]: target, command and flag modifications, applicable right away.
//! - [`PendingContext`]: a future that resolves to another context later. Nested pending results
//!   are unwrapped, so observers only ever see a terminal context or a failure.
//! - [`MultiCandidateContext`]: several equally valid targets; an explicit choice is needed
//!   before the configuration can run.

use std::collections::BTreeSet;

use crate::configuration::{RunConfiguration, RunConfigurationState, Ticket};
use crate::error::Result;
use crate::future::{ProgressIndicator, WaitOptions};
use crate::types::{BuildCommand, ExecutorType, SourceElement};

mod builder;
mod disambiguation;
mod flags;
mod known;
mod pending;


pub use builder::TestContextBuilder;
pub use disambiguation::{MultiCandidateContext, TargetChooser, web_test_context};
pub use flags::{
    DEFAULT_TEST_ENV_FLAG, DEFAULT_TEST_FILTER_FLAG, FlagModification, FlagNames, encode_param,
};
pub use known::KnownContext;
pub use pending::{DEFAULT_MAX_UNWRAP_DEPTH, PendingContext};

/// What every context variant carries about its origin and the flags it applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDetails {
    pub element: SourceElement,
    pub command: BuildCommand,
    pub flags: Vec<FlagModification>,
    /// Replaces the target in the configuration name, which then stays fixed
    pub description: Option<String>,
    pub executors: BTreeSet<ExecutorType>,
}

impl ContextDetails {
    pub fn new(element: SourceElement, command: BuildCommand) -> Self {
        Self {
            element,
            command,
            flags: Vec::new(),
            description: None,
            executors: ExecutorType::defaults(),
        }
    }

    /// Command, flags and name for a configuration whose target isn't known yet.
    pub(crate) fn apply_unresolved(&self, state: &mut RunConfigurationState) {
        state.set_command(self.command);
        self.apply_flags(state);
        match &self.description {
            Some(description) => state.set_described_name(description),
            None => state.set_generated_name_for(&self.element.display_name()),
        }
    }

    pub(crate) fn apply_flags(&self, state: &mut RunConfigurationState) {
        for modification in &self.flags {
            modification.apply(state.flags_mut());
        }
    }

    /// Command and flag part of the reuse check. Cosmetic state is ignored.
    pub(crate) fn matches_command_and_flags(&self, state: &RunConfigurationState) -> bool {
        state.command() == Some(self.command)
            && self
                .flags
                .iter()
                .all(|modification| modification.matches(state.flags()))
    }

    /// Reuse check while no target is known: same source element
    pub(crate) fn matches_element(&self, state: &RunConfigurationState) -> bool {
        self.matches_command_and_flags(state)
            && state.context_element() == Some(self.element.element_key().as_str())
    }
}

/// Host collaborators needed to finish a context before launch
#[derive(Clone, Copy)]
pub struct ResolveEnv<'a> {
    pub progress: &'a dyn ProgressIndicator,
    pub chooser: &'a dyn TargetChooser,
    pub wait: WaitOptions,
}

#[derive(Debug, Clone)]
pub enum RunConfigurationContext {
    Known(KnownContext),
    Pending(PendingContext),
    MultiCandidate(MultiCandidateContext),
}

impl RunConfigurationContext {
    pub fn details(&self) -> &ContextDetails {
        match self {
            RunConfigurationContext::Known(known) => known.details(),
            RunConfigurationContext::Pending(pending) => pending.details(),
            RunConfigurationContext::MultiCandidate(multi) => multi.details(),
        }
    }

    pub fn source_element(&self) -> &SourceElement {
        &self.details().element
    }

    pub fn supported_executors(&self) -> &BTreeSet<ExecutorType> {
        &self.details().executors
    }

    /// Known contexts are always done; pending ones once their future is.
    /// A disambiguation is never done on its own, it waits for a choice.
    pub fn is_done(&self) -> bool {
        match self {
            RunConfigurationContext::Known(_) => true,
            RunConfigurationContext::Pending(pending) => pending.is_done(),
            RunConfigurationContext::MultiCandidate(_) => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            RunConfigurationContext::Pending(pending) => pending.is_cancelled(),
            _ => false,
        }
    }

    /// Whether the context failed or was cancelled; such contexts are not worth caching.
    pub fn is_failed(&self) -> bool {
        match self {
            RunConfigurationContext::Pending(pending) => pending.is_failed(),
            _ => false,
        }
    }

    /// Identity for pending owners: the same pending or disambiguation instance.
    pub fn same_instance(&self, other: &RunConfigurationContext) -> bool {
        match (self, other) {
            (RunConfigurationContext::Pending(a), RunConfigurationContext::Pending(b)) => {
                a.ptr_eq(b)
            }
            (
                RunConfigurationContext::MultiCandidate(a),
                RunConfigurationContext::MultiCandidate(b),
            ) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Applies the context to `config`. Returns false if the configuration could not be set up.
    ///
    /// Known contexts apply immediately. Pending contexts take ownership of the configuration
    /// and apply their result when it arrives, unless a newer context took over meanwhile.
    pub fn setup_run_configuration(&self, config: &RunConfiguration) -> bool {
        match self {
            RunConfigurationContext::Known(known) => {
                config.update(|state| known.apply_to(state));
                true
            }
            RunConfigurationContext::Pending(pending) => pending.setup_target(config),
            RunConfigurationContext::MultiCandidate(multi) => {
                multi.setup(config);
                true
            }
        }
    }

    /// Reuse check: would setting up `config` from this context be a no-op?
    pub fn matches_run_configuration(&self, config: &RunConfiguration) -> bool {
        config.read(|state| self.matches_state(state))
    }

    pub(crate) fn matches_state(&self, state: &RunConfigurationState) -> bool {
        match self {
            RunConfigurationContext::Known(known) => known.matches_state(state),
            RunConfigurationContext::Pending(pending) => pending.matches_state(state),
            RunConfigurationContext::MultiCandidate(multi) => multi.matches_state(state),
        }
    }

    /// Finishes the context before launch: waits for a pending result under progress, asks the
    /// chooser when there are several candidates. Afterwards `config` holds the final target.
    pub fn resolve(&self, config: &RunConfiguration, env: &ResolveEnv<'_>) -> Result<()> {
        match self {
            RunConfigurationContext::Known(_) => Ok(()),
            RunConfigurationContext::Pending(pending) => pending.resolve(config, env),
            RunConfigurationContext::MultiCandidate(multi) => multi.resolve(config, env),
        }
    }

    /// Applies a resolved context on behalf of the owner holding `ticket`.
    /// The caller has already checked that `ticket` owns `state`.
    pub(crate) fn apply_resolved(&self, state: &mut RunConfigurationState, ticket: Ticket) -> bool {
        match self {
            RunConfigurationContext::Known(known) => {
                known.apply_to(state);
                true
            }
            RunConfigurationContext::MultiCandidate(multi) => {
                multi.take_over(state, ticket);
                true
            }
            RunConfigurationContext::Pending(pending) => {
                tracing::warn!(
                    "unflattened pending context for {}",
                    pending.details().element.element_key()
                );
                false
            }
        }
    }
}

impl From<KnownContext> for RunConfigurationContext {
    fn from(known: KnownContext) -> Self {
        RunConfigurationContext::Known(known)
    }
}

impl From<PendingContext> for RunConfigurationContext {
    fn from(pending: PendingContext) -> Self {
        RunConfigurationContext::Pending(pending)
    }
}

impl From<MultiCandidateContext> for RunConfigurationContext {
    fn from(multi: MultiCandidateContext) -> Self {
        RunConfigurationContext::MultiCandidate(multi)
    }
}
