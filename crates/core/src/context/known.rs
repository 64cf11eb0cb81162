use super::ContextDetails;
use crate::configuration::RunConfigurationState;
use crate::types::TargetInfo;

/// A context whose target is already known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownContext {
    target: TargetInfo,
    details: ContextDetails,
}

impl KnownContext {
    pub fn new(target: TargetInfo, details: ContextDetails) -> Self {
        Self { target, details }
    }

    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    pub fn details(&self) -> &ContextDetails {
        &self.details
    }

    /// Same context, different target
    pub fn with_target(&self, target: TargetInfo) -> Self {
        Self {
            target,
            details: self.details.clone(),
        }
    }

    /// Sets target, command, flags and name. Drops any pending owner, so a resolution still in
    /// flight for this configuration can no longer touch it.
    pub(crate) fn apply_to(&self, state: &mut RunConfigurationState) {
        state.clear_pending();
        state.set_target_info(&self.target);
        state.set_command(self.details.command);
        self.details.apply_flags(state);
        match &self.details.description {
            Some(description) => state.set_described_name(description),
            None => state.set_generated_name(),
        }
        tracing::debug!(
            "configured {} {} for {}",
            self.details.command,
            self.target.label,
            self.details.element.element_key()
        );
    }

    pub(crate) fn matches_state(&self, state: &RunConfigurationState) -> bool {
        state.single_label().as_ref() == Some(&self.target.label)
            && self.details.matches_command_and_flags(state)
    }
}
