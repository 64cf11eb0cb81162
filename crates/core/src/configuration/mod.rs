//! Run configurations
//!
//! A [`RunConfiguration`] is the object a context is applied to: target patterns, command, flags
//! and a generated or user-chosen name. While its target is still being looked up it carries a
//! pending owner, identified by a [`Ticket`]. Every mutation happens under one lock, so a
//! resolution that checks its ticket and applies its result can't interleave with a newer
//! context taking over.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::RunConfigurationContext;
use crate::error::{Error, Result};
use crate::future::ListenableFuture;
use crate::lookup::TargetLookup;
use crate::types::{BuildCommand, TargetInfo, TargetPattern};

mod name;
mod state;


pub use name::NameBuilder;
pub use state::{CommonState, HandlerKind, RunConfigurationState, Ticket};

/// Persisted form of a configuration. The pending owner is runtime-only and never saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfigurationSnapshot {
    pub name: String,
    #[serde(default)]
    pub name_changed_by_user: bool,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_in_sync: Option<bool>,
    pub handler: HandlerKind,
    #[serde(default)]
    pub state: CommonState,
}

/// Shared handle to one run configuration
#[derive(Clone)]
pub struct RunConfiguration {
    state: Arc<Mutex<RunConfigurationState>>,
}

impl std::fmt::Debug for RunConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.read(|state| {
            f.debug_struct("RunConfiguration")
                .field("name", &state.name())
                .field("targets", &state.target_patterns())
                .field("command", &state.command())
                .field("pending", &state.is_pending())
                .finish()
        })
    }
}

impl RunConfiguration {
    pub fn new(build_system: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunConfigurationState::new(build_system.into()))),
        }
    }

    /// Runs `f` with the state locked for reading. `f` must not call back into this handle.
    pub fn read<R>(&self, f: impl FnOnce(&RunConfigurationState) -> R) -> R {
        f(&self.state.lock())
    }

    /// Runs `f` with the state locked for writing. `f` must not call back into this handle.
    pub fn update<R>(&self, f: impl FnOnce(&mut RunConfigurationState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Same underlying configuration
    pub fn ptr_eq(&self, other: &RunConfiguration) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn name(&self) -> String {
        self.read(|s| s.name().to_string())
    }

    pub fn target_patterns(&self) -> Vec<String> {
        self.read(|s| s.target_patterns().to_vec())
    }

    pub fn command(&self) -> Option<BuildCommand> {
        self.read(|s| s.command())
    }

    pub fn flags(&self) -> Vec<String> {
        self.read(|s| s.flags().to_vec())
    }

    pub fn target_kind(&self) -> Option<String> {
        self.read(|s| s.target_kind().map(str::to_string))
    }

    pub fn handler(&self) -> HandlerKind {
        self.read(|s| s.handler())
    }

    pub fn context_element(&self) -> Option<String> {
        self.read(|s| s.context_element().map(str::to_string))
    }

    pub fn is_pending(&self) -> bool {
        self.read(|s| s.is_pending())
    }

    pub fn pending_context(&self) -> Option<RunConfigurationContext> {
        self.read(|s| s.pending_context().cloned())
    }

    pub fn set_target_info(&self, target: &TargetInfo) {
        self.update(|s| s.set_target_info(target));
    }

    pub fn set_targets(&self, targets: &[TargetPattern]) {
        self.update(|s| s.set_targets(targets));
    }

    pub fn set_command(&self, command: BuildCommand) {
        self.update(|s| s.set_command(command));
    }

    pub fn set_flags(&self, flags: Vec<String>) {
        self.update(|s| s.set_flags(flags));
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.update(|s| s.set_name(name));
    }

    pub fn set_generated_name(&self) {
        self.update(|s| s.set_generated_name());
    }

    pub fn clear_pending(&self) {
        self.update(|s| s.clear_pending());
    }

    /// Applies `f` only if `ticket` still owns the configuration; the check and the update
    /// happen under one lock.
    pub(crate) fn apply_if_owner<R>(
        &self,
        ticket: Ticket,
        f: impl FnOnce(&mut RunConfigurationState) -> R,
    ) -> Result<R> {
        let mut state = self.state.lock();
        if !state.is_owned_by(ticket) {
            return Err(Error::Superseded);
        }
        Ok(f(&mut state))
    }

    /// True if a pending setup finished without producing a target. Such configurations are
    /// removed on the next sync.
    ///
    /// A finished setup that left targets behind (for example because the user edited the
    /// configuration meanwhile) keeps the configuration and just drops the pending owner.
    /// Cancelled setups are kept for a retry.
    pub fn pending_setup_failed(&self) -> bool {
        self.update(|state| {
            let Some(context) = state.pending_context() else {
                return false;
            };
            if !context.is_done() || context.is_cancelled() {
                return false;
            }
            if state.target_patterns().is_empty() {
                return true;
            }
            state.clear_pending();
            false
        })
    }

    /// Validates the configuration before it is run.
    pub fn check_configuration(&self) -> Result<()> {
        self.read(|state| {
            if state
                .pending_context()
                .is_some_and(|context| !context.is_done())
            {
                return Ok(());
            }

            let is_info = state.command() == Some(BuildCommand::Info);
            let missing = || {
                Error::InvalidConfiguration(format!(
                    "You must specify a {} target expression.",
                    state.build_system()
                ))
            };

            if state.target_patterns().is_empty() && !is_info {
                return Err(missing());
            }
            for pattern in state.target_patterns() {
                if pattern.trim().is_empty() {
                    if is_info {
                        continue;
                    }
                    return Err(missing());
                }
                if !pattern.starts_with("//") && !pattern.starts_with('@') {
                    return Err(Error::InvalidConfiguration(
                        "You must specify the full target expression, starting with // or @"
                            .to_string(),
                    ));
                }
                if let Some(reason) = TargetPattern::validate(pattern) {
                    return Err(Error::InvalidConfiguration(reason));
                }
            }
            Ok(())
        })
    }

    /// Refreshes the target kind from `lookup`.
    ///
    /// Only a single-label configuration has a kind. When the lookup isn't done yet the kind is
    /// cleared and filled in on completion, provided the configuration still points at the same
    /// label. Lookup failures leave the kind unknown.
    pub fn update_target_kind(&self, lookup: &dyn TargetLookup) -> ListenableFuture<Option<String>> {
        let Some(label) = self.read(|s| s.single_label()) else {
            self.update(|s| s.set_target_kind(None));
            return ListenableFuture::ready(None);
        };

        let future = lookup.target_info(&label);
        if let Some(outcome) = future.try_outcome() {
            let kind = outcome.ok().flatten().map(|info| info.kind);
            self.update(|s| s.set_target_kind(kind.clone()));
            return ListenableFuture::ready(kind);
        }

        self.update(|s| s.set_target_kind(None));
        let config = self.clone();
        future.map(move |info| {
            let kind = info.map(|info| info.kind);
            config.update(|s| {
                if s.single_label().as_ref() == Some(&label) {
                    s.set_target_kind(kind.clone());
                } else {
                    tracing::debug!("target changed before kind lookup for {} finished", label);
                }
            });
            kind
        })
    }

    pub fn snapshot(&self) -> RunConfigurationSnapshot {
        self.read(|s| RunConfigurationSnapshot {
            name: s.name().to_string(),
            name_changed_by_user: s.name_changed_by_user(),
            targets: s.target_patterns().to_vec(),
            kind: s.target_kind().map(str::to_string),
            context_element: s.context_element().map(str::to_string),
            keep_in_sync: s.keep_in_sync(),
            handler: s.handler(),
            state: s.common.clone(),
        })
    }

    /// Recreates a configuration from its persisted form. The stored handler is used as is,
    /// since no target data may be available yet.
    pub fn restore(snapshot: RunConfigurationSnapshot, build_system: impl Into<String>) -> Self {
        let config = Self::new(build_system);
        config.update(|s| {
            s.name = snapshot.name;
            s.name_changed_by_user = snapshot.name_changed_by_user;
            s.target_patterns = snapshot
                .targets
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            s.target_kind = snapshot.kind;
            s.context_element = snapshot.context_element;
            s.keep_in_sync = snapshot.keep_in_sync;
            s.handler = snapshot.handler;
            s.common = snapshot.state;
        });
        config
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn from_json(json: &str, build_system: impl Into<String>) -> Result<Self> {
        let snapshot: RunConfigurationSnapshot = serde_json::from_str(json)?;
        Ok(Self::restore(snapshot, build_system))
    }
}
