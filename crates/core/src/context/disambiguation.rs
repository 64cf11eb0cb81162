//! Disambiguation between equally valid targets
//!
//! Some sources map to several targets that are equally right, typically the web test wrappers
//! around one test. Rather than guess, the resolver hands the list to the host's
//! [`TargetChooser`] at launch time. The choice sticks to the configuration for the session but
//! is never persisted, and it is only reused while it is still among the current candidates.

use std::sync::Arc;

use super::{ContextDetails, KnownContext, ResolveEnv, RunConfigurationContext};
use crate::configuration::{RunConfiguration, RunConfigurationState, Ticket};
use crate::error::{Error, Result};
use crate::types::{SourceElement, TargetInfo};

/// Host-side picker for one of several candidate targets
pub trait TargetChooser: Send + Sync {
    /// Index into `candidates`, or `None` if the user dismissed the choice.
    fn choose(&self, element: &SourceElement, candidates: &[TargetInfo]) -> Option<usize>;
}

struct MultiInner {
    details: ContextDetails,
    candidates: Vec<TargetInfo>,
}

#[derive(Clone)]
pub struct MultiCandidateContext {
    inner: Arc<MultiInner>,
}

impl std::fmt::Debug for MultiCandidateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiCandidateContext")
            .field("element", &self.inner.details.element.element_key())
            .field(
                "candidates",
                &self
                    .inner
                    .candidates
                    .iter()
                    .map(|t| t.label.to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl MultiCandidateContext {
    /// No context for zero candidates, a known context for one, a disambiguation otherwise.
    pub fn from_candidates(
        details: ContextDetails,
        candidates: Vec<TargetInfo>,
    ) -> Option<RunConfigurationContext> {
        match candidates.len() {
            0 => None,
            1 => candidates
                .into_iter()
                .next()
                .map(|target| KnownContext::new(target, details).into()),
            _ => Some(
                MultiCandidateContext {
                    inner: Arc::new(MultiInner {
                        details,
                        candidates,
                    }),
                }
                .into(),
            ),
        }
    }

    pub fn details(&self) -> &ContextDetails {
        &self.inner.details
    }

    pub fn candidates(&self) -> &[TargetInfo] {
        &self.inner.candidates
    }

    pub fn ptr_eq(&self, other: &MultiCandidateContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn known_for(&self, target: &TargetInfo) -> KnownContext {
        KnownContext::new(target.clone(), self.inner.details.clone())
    }

    /// The configuration's earlier choice, if it is still a candidate
    fn sticky_choice<'a>(&'a self, state: &RunConfigurationState) -> Option<&'a TargetInfo> {
        let chosen = state.chosen_target()?;
        self.inner.candidates.iter().find(|t| &t.label == chosen)
    }

    pub(crate) fn setup(&self, config: &RunConfiguration) {
        config.update(|state| {
            let ticket = state.attach_pending(RunConfigurationContext::MultiCandidate(self.clone()));
            self.take_over(state, ticket);
        });
    }

    /// Becomes the configuration's owner, or applies the sticky choice right away.
    pub(crate) fn take_over(&self, state: &mut RunConfigurationState, ticket: Ticket) {
        if let Some(target) = self.sticky_choice(state).cloned() {
            tracing::debug!("reusing earlier choice {}", target.label);
            self.known_for(&target).apply_to(state);
            return;
        }
        state.replace_pending(ticket, RunConfigurationContext::MultiCandidate(self.clone()));
        self.inner.details.apply_unresolved(state);
    }

    pub(crate) fn matches_state(&self, state: &RunConfigurationState) -> bool {
        match self.sticky_choice(state) {
            Some(target) => self.known_for(target).matches_state(state),
            None => self.inner.details.matches_element(state),
        }
    }

    /// Asks the chooser (unless an earlier choice still applies) and applies the pick.
    pub(crate) fn resolve(&self, config: &RunConfiguration, env: &ResolveEnv<'_>) -> Result<()> {
        let sticky = config.read(|state| self.sticky_choice(state).cloned());
        let target = match sticky {
            Some(target) => target,
            None => {
                let index = env
                    .chooser
                    .choose(&self.inner.details.element, &self.inner.candidates)
                    .ok_or(Error::Cancelled)?;
                self.inner.candidates.get(index).cloned().ok_or_else(|| {
                    Error::Other(format!(
                        "chooser picked {} of {} candidates",
                        index,
                        self.inner.candidates.len()
                    ))
                })?
            }
        };

        let this = RunConfigurationContext::MultiCandidate(self.clone());
        let known = self.known_for(&target);
        config.update(|state| {
            if state.ticket_of(&this).is_none() && state.single_label().as_ref() != Some(&target.label) {
                return Err(Error::Superseded);
            }
            state.chosen_target = Some(target.label.clone());
            known.apply_to(state);
            Ok(())
        })
    }
}

/// Substitutes web test wrappers for `original`: none keeps the original, one replaces it, and
/// several need an explicit choice.
pub fn web_test_context(original: KnownContext, wrappers: Vec<TargetInfo>) -> RunConfigurationContext {
    let details = original.details().clone();
    MultiCandidateContext::from_candidates(details, wrappers)
        .unwrap_or(RunConfigurationContext::Known(original))
}
