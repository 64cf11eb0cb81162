use serde::{Deserialize, Serialize};

use super::name::NameBuilder;
use crate::context::RunConfigurationContext;
use crate::types::{BuildCommand, Label, TargetInfo, TargetPattern};

/// Generation stamp identifying one pending owner of a configuration
pub type Ticket = u64;

/// Which handler interprets the configuration, derived from its target state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// No targets yet; a pending context is filling them in
    Pending,
    Generic,
}

/// Command and flags shared by every handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<BuildCommand>,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// The pending context currently allowed to populate the configuration
#[derive(Debug, Clone)]
pub(crate) struct PendingOwner {
    pub(crate) ticket: Ticket,
    pub(crate) context: RunConfigurationContext,
}

/// Mutable state of a [`RunConfiguration`](super::RunConfiguration), always accessed under its lock.
#[derive(Debug)]
pub struct RunConfigurationState {
    pub(crate) build_system: String,
    pub(crate) name: String,
    pub(crate) name_changed_by_user: bool,
    pub(crate) target_patterns: Vec<String>,
    pub(crate) target_kind: Option<String>,
    pub(crate) context_element: Option<String>,
    pub(crate) keep_in_sync: Option<bool>,
    pub(crate) handler: HandlerKind,
    pub(crate) common: CommonState,
    pub(crate) pending: Option<PendingOwner>,
    pub(crate) next_ticket: Ticket,
    /// Target picked in the last disambiguation; runtime only
    pub(crate) chosen_target: Option<Label>,
}

impl RunConfigurationState {
    pub(crate) fn new(build_system: String) -> Self {
        let mut state = Self {
            build_system,
            name: String::new(),
            name_changed_by_user: false,
            target_patterns: Vec::new(),
            target_kind: None,
            context_element: None,
            keep_in_sync: None,
            handler: HandlerKind::Generic,
            common: CommonState::default(),
            pending: None,
            next_ticket: 0,
            chosen_target: None,
        };
        state.name = NameBuilder::for_state(&state).build();
        state
    }

    pub fn build_system(&self) -> &str {
        &self.build_system
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_changed_by_user(&self) -> bool {
        self.name_changed_by_user
    }

    pub fn target_patterns(&self) -> &[String] {
        &self.target_patterns
    }

    /// Parsed target patterns; unparseable entries are skipped.
    pub fn targets(&self) -> Vec<TargetPattern> {
        self.target_patterns
            .iter()
            .filter_map(|pattern| TargetPattern::parse(pattern).ok())
            .collect()
    }

    /// The single label this configuration runs, if there is exactly one target and it's a label.
    pub fn single_label(&self) -> Option<Label> {
        match self.targets().as_slice() {
            [TargetPattern::Label(label)] => Some(label.clone()),
            _ => None,
        }
    }

    pub fn target_kind(&self) -> Option<&str> {
        self.target_kind.as_deref()
    }

    pub fn context_element(&self) -> Option<&str> {
        self.context_element.as_deref()
    }

    pub fn keep_in_sync(&self) -> Option<bool> {
        self.keep_in_sync
    }

    pub fn handler(&self) -> HandlerKind {
        self.handler
    }

    pub fn command(&self) -> Option<BuildCommand> {
        self.common.command
    }

    pub fn flags(&self) -> &[String] {
        &self.common.flags
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_context(&self) -> Option<&RunConfigurationContext> {
        self.pending.as_ref().map(|owner| &owner.context)
    }

    pub(crate) fn pending_ticket(&self) -> Option<Ticket> {
        self.pending.as_ref().map(|owner| owner.ticket)
    }

    pub(crate) fn is_owned_by(&self, ticket: Ticket) -> bool {
        self.pending_ticket() == Some(ticket)
    }

    /// Ticket of the owner if `context` is the current pending owner
    pub(crate) fn ticket_of(&self, context: &RunConfigurationContext) -> Option<Ticket> {
        self.pending
            .as_ref()
            .filter(|owner| owner.context.same_instance(context))
            .map(|owner| owner.ticket)
    }

    pub fn chosen_target(&self) -> Option<&Label> {
        self.chosen_target.as_ref()
    }

    /// A user-chosen name; generated names never overwrite it afterwards.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.name_changed_by_user = true;
    }

    /// Regenerates the name from the current state unless the user owns it.
    pub fn set_generated_name(&mut self) {
        if self.name_changed_by_user {
            return;
        }
        self.name = NameBuilder::for_state(self).build();
    }

    /// Generated name with `target` standing in for the not yet known targets
    pub(crate) fn set_generated_name_for(&mut self, target: &str) {
        if self.name_changed_by_user {
            return;
        }
        self.name = NameBuilder::for_state(self)
            .with_target_string(target)
            .build();
    }

    /// Names the configuration after `description` and keeps it from being regenerated.
    pub fn set_described_name(&mut self, description: &str) {
        self.name = NameBuilder::for_state(self)
            .with_target_string(description)
            .build();
        self.name_changed_by_user = true;
    }

    pub fn set_target_info(&mut self, target: &TargetInfo) {
        self.target_patterns = vec![target.label.to_string()];
        self.set_target_kind(Some(target.kind.clone()));
    }

    /// Replaces the targets. The kind becomes unknown until the next kind refresh.
    pub fn set_targets(&mut self, targets: &[TargetPattern]) {
        self.target_patterns = targets.iter().map(ToString::to_string).collect();
        self.set_target_kind(None);
    }

    pub fn set_command(&mut self, command: BuildCommand) {
        self.common.command = Some(command);
    }

    pub fn set_flags(&mut self, flags: Vec<String>) {
        self.common.flags = flags;
    }

    pub fn flags_mut(&mut self) -> &mut Vec<String> {
        &mut self.common.flags
    }

    pub fn set_keep_in_sync(&mut self, keep_in_sync: Option<bool>) {
        self.keep_in_sync = keep_in_sync;
    }

    pub(crate) fn set_target_kind(&mut self, kind: Option<String>) {
        self.target_kind = kind;
        self.update_handler();
    }

    /// Makes `context` the pending owner, displacing any previous owner.
    pub(crate) fn attach_pending(&mut self, context: RunConfigurationContext) -> Ticket {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.context_element = Some(context.source_element().element_key());
        self.pending = Some(PendingOwner { ticket, context });
        self.target_patterns.clear();
        self.set_target_kind(None);
        ticket
    }

    /// Hands ownership to `context` under the same ticket, e.g. a resolved disambiguation step.
    pub(crate) fn replace_pending(&mut self, ticket: Ticket, context: RunConfigurationContext) {
        self.pending = Some(PendingOwner { ticket, context });
        self.update_handler();
    }

    /// Drops the pending owner. Any resolution still in flight becomes a no-op.
    pub fn clear_pending(&mut self) {
        self.pending = None;
        self.update_handler();
    }

    fn update_handler(&mut self) {
        self.handler = if self.target_patterns.is_empty() && self.pending.is_some() {
            HandlerKind::Pending
        } else {
            HandlerKind::Generic
        };
    }
}
