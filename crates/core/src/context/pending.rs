//! Pending contexts
//!
//! A [`PendingContext`] stands in for a context whose target lookup is still running. It owns a
//! flattened view of the lookup: whenever the result is itself pending, the flattening step moves
//! on to that context's future instead of surfacing a context-of-a-context. The loop runs
//! synchronously while futures are already done and parks a single listener otherwise, up to a
//! fixed nesting depth.
//!
//! Applying the result is guarded by the configuration's owner ticket. A newer context setting up
//! the same configuration takes a new ticket, and the older result is silently dropped.

use std::sync::Arc;

use super::{ContextDetails, ResolveEnv, RunConfigurationContext};
use crate::configuration::{RunConfiguration, RunConfigurationState, Ticket};
use crate::error::{Error, Result};
use crate::future::{FutureError, ListenableFuture, Promise, wait_under_progress};

pub const DEFAULT_MAX_UNWRAP_DEPTH: usize = 32;

struct PendingInner {
    details: ContextDetails,
    /// The future as supplied, possibly resolving to another pending context
    source: ListenableFuture<RunConfigurationContext>,
    /// Terminal result: never a pending context
    resolved: ListenableFuture<RunConfigurationContext>,
    progress_message: String,
}

#[derive(Clone)]
pub struct PendingContext {
    inner: Arc<PendingInner>,
}

impl std::fmt::Debug for PendingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingContext")
            .field("element", &self.inner.details.element.element_key())
            .field("resolved", &self.inner.resolved)
            .finish()
    }
}

impl PendingContext {
    pub fn new(
        details: ContextDetails,
        future: ListenableFuture<RunConfigurationContext>,
        progress_message: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        let resolved = flatten(future.clone(), max_depth);
        Self {
            inner: Arc::new(PendingInner {
                details,
                source: future,
                resolved,
                progress_message: progress_message.into(),
            }),
        }
    }

    pub fn details(&self) -> &ContextDetails {
        &self.inner.details
    }

    /// The terminal context if the lookup already succeeded, this pending context otherwise.
    ///
    /// Failures stay pending so setup reports them through the usual path.
    pub fn into_settled(self) -> RunConfigurationContext {
        match self.inner.resolved.try_outcome() {
            Some(Ok(context)) => context,
            _ => self.into(),
        }
    }

    pub fn progress_message(&self) -> &str {
        &self.inner.progress_message
    }

    /// The flattened result. Cancelling it also cancels the lookup behind it, unless another
    /// context still waits on that lookup.
    pub fn future(&self) -> &ListenableFuture<RunConfigurationContext> {
        &self.inner.resolved
    }

    pub fn is_done(&self) -> bool {
        self.inner.resolved.is_done()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.resolved.is_cancelled()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.inner.resolved.try_outcome(), Some(Err(_)))
    }

    /// Stops waiting for the lookup, and stops the lookup itself if nothing else needs it.
    pub fn cancel(&self) -> bool {
        self.inner.resolved.cancel()
    }

    pub fn ptr_eq(&self, other: &PendingContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Takes ownership of `config` and fills it in once the result is known.
    ///
    /// Returns the outcome of the setup if the result is already there, true otherwise.
    pub fn setup_target(&self, config: &RunConfiguration) -> bool {
        let this = RunConfigurationContext::Pending(self.clone());
        let ticket = config.update(|state| {
            let ticket = state.attach_pending(this);
            self.inner.details.apply_unresolved(state);
            ticket
        });
        tracing::debug!(
            "pending context for {} owns configuration (ticket {})",
            self.inner.details.element.element_key(),
            ticket
        );

        if self.inner.resolved.is_done() {
            return self.finish_setup(config, ticket);
        }

        let pending = self.clone();
        let config = config.clone();
        self.inner.resolved.on_complete(move |_| {
            pending.finish_setup(&config, ticket);
        });
        true
    }

    fn finish_setup(&self, config: &RunConfiguration, ticket: Ticket) -> bool {
        let key = self.inner.details.element.element_key();
        let Some(outcome) = self.inner.resolved.try_outcome() else {
            return false;
        };

        match outcome {
            Ok(context) => {
                match config.apply_if_owner(ticket, |state| context.apply_resolved(state, ticket)) {
                    Ok(applied) => applied,
                    Err(_) => {
                        tracing::debug!("pending context for {} was superseded", key);
                        false
                    }
                }
            }
            Err(error) => {
                match error.into_resolution_error() {
                    Error::Cancelled => tracing::debug!("resolution for {} cancelled", key),
                    Error::NoTargetFound(message) => {
                        tracing::debug!("no target for {}: {}", key, message)
                    }
                    other => tracing::warn!("resolution for {} failed: {}", key, other),
                }
                false
            }
        }
    }

    /// Reuse check: by source element while running, by the resolved context afterwards.
    pub(crate) fn matches_state(&self, state: &RunConfigurationState) -> bool {
        match self.inner.resolved.try_outcome() {
            None => self.inner.details.matches_element(state),
            Some(Ok(context)) => context.matches_state(state),
            Some(Err(_)) => false,
        }
    }

    /// Blocks under progress until the result is known, then makes sure `config` reflects it.
    pub(crate) fn resolve(&self, config: &RunConfiguration, env: &ResolveEnv<'_>) -> Result<()> {
        let outcome = wait_under_progress(
            &self.inner.resolved,
            env.progress,
            &self.inner.progress_message,
            env.wait,
        );
        let context = outcome.map_err(FutureError::into_resolution_error)?;

        // The completion listener may not have run yet
        let this = RunConfigurationContext::Pending(self.clone());
        if let Some(ticket) = config.read(|state| state.ticket_of(&this)) {
            let _ = config.apply_if_owner(ticket, |state| context.apply_resolved(state, ticket));
        }

        context.resolve(config, env)
    }
}

/// Follows nested pending results until a terminal context or a failure.
fn flatten(
    future: ListenableFuture<RunConfigurationContext>,
    max_depth: usize,
) -> ListenableFuture<RunConfigurationContext> {
    let promise = Promise::new();
    let resolved = promise.future();
    unwrap_step(future, promise, 0, max_depth);
    resolved
}

fn unwrap_step(
    mut future: ListenableFuture<RunConfigurationContext>,
    promise: Promise<RunConfigurationContext>,
    mut depth: usize,
    max_depth: usize,
) {
    loop {
        if promise.is_cancelled() {
            return;
        }
        match future.try_outcome() {
            Some(Ok(RunConfigurationContext::Pending(nested))) => {
                depth += 1;
                if depth > max_depth {
                    promise.fail(Error::UnwrapDepthExceeded(max_depth));
                    return;
                }
                future = nested.inner.source.clone();
            }
            Some(outcome) => {
                promise.settle(outcome);
                return;
            }
            None => {
                promise.future().depends_on(&future);
                let waiting = future.clone();
                future.on_complete(move |_| unwrap_step(waiting, promise, depth, max_depth));
                return;
            }
        }
    }
}
