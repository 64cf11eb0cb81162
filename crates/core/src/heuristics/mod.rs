//! Test target heuristics
//!
//! When a source file belongs to several test targets, the resolver narrows the candidates with
//! an ordered chain of boolean heuristics. The chain is a priority filter, never a score:
//!
//! 1. a heuristic matching exactly one survivor selects it immediately,
//! 2. one matching several survivors narrows the working set to those,
//! 3. one matching none is skipped.
//!
//! If nothing narrows to a single target, the most recently synced survivor wins. Targets that
//! were never synced sort first and therefore lose ties.

use serde::Serialize;
use std::sync::Arc;

use crate::types::{SourceContext, TargetInfo};

mod name;
mod size;
mod source;


pub use name::{QualifiedClassNameHeuristic, RoughNameHeuristic, TargetNameHeuristic};
pub use size::TestSizeHeuristic;
pub use source::{PackageHeuristic, SourceFileHeuristic};

/// Boolean predicate over (source context, candidate target)
pub trait TestTargetHeuristic: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &'static str;

    fn matches(&self, context: &SourceContext, target: &TargetInfo) -> bool;
}

/// Names of the built-in heuristics, as used in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicId {
    SourceFile,
    Package,
    TargetName,
    QualifiedClassName,
    TestSize,
    RoughName,
}

crate::impl_case_insensitive_deserialize!(
    HeuristicId,
    SourceFile => "source_file",
    Package => "package",
    TargetName => "target_name",
    QualifiedClassName => "qualified_class_name",
    TestSize => "test_size",
    RoughName => "rough_name"
);

impl HeuristicId {
    /// Default priority order
    pub fn default_order() -> Vec<HeuristicId> {
        vec![
            HeuristicId::SourceFile,
            HeuristicId::Package,
            HeuristicId::TargetName,
            HeuristicId::QualifiedClassName,
            HeuristicId::TestSize,
            HeuristicId::RoughName,
        ]
    }

    pub fn create(self) -> Arc<dyn TestTargetHeuristic> {
        match self {
            HeuristicId::SourceFile => Arc::new(SourceFileHeuristic),
            HeuristicId::Package => Arc::new(PackageHeuristic),
            HeuristicId::TargetName => Arc::new(TargetNameHeuristic),
            HeuristicId::QualifiedClassName => Arc::new(QualifiedClassNameHeuristic),
            HeuristicId::TestSize => Arc::new(TestSizeHeuristic),
            HeuristicId::RoughName => Arc::new(RoughNameHeuristic),
        }
    }
}

/// Ordered, read-only list of heuristics. Built once at startup, then shared.
#[derive(Clone, Default)]
pub struct HeuristicRegistry {
    heuristics: Vec<Arc<dyn TestTargetHeuristic>>,
}

impl std::fmt::Debug for HeuristicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeuristicRegistry")
            .field(
                "heuristics",
                &self.heuristics.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl HeuristicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in heuristics in default priority order
    pub fn with_defaults() -> Self {
        Self::from_order(&HeuristicId::default_order())
    }

    pub fn from_order(order: &[HeuristicId]) -> Self {
        let mut registry = Self::new();
        for id in order {
            registry.register(id.create());
        }
        registry
    }

    /// Appends `heuristic` at the lowest priority.
    pub fn register(&mut self, heuristic: Arc<dyn TestTargetHeuristic>) {
        self.heuristics.push(heuristic);
    }

    pub fn with(mut self, heuristic: Arc<dyn TestTargetHeuristic>) -> Self {
        self.register(heuristic);
        self
    }

    pub fn len(&self) -> usize {
        self.heuristics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heuristics.is_empty()
    }

    pub fn choose_target(
        &self,
        context: &SourceContext,
        candidates: &[TargetInfo],
    ) -> Option<TargetInfo> {
        choose_target(&self.heuristics, context, candidates)
    }
}

/// Picks one target out of `candidates` for `context`. `None` only when `candidates` is empty.
pub fn choose_target(
    heuristics: &[Arc<dyn TestTargetHeuristic>],
    context: &SourceContext,
    candidates: &[TargetInfo],
) -> Option<TargetInfo> {
    match candidates {
        [] => return None,
        [only] => return Some(only.clone()),
        _ => {}
    }

    let mut survivors: Vec<&TargetInfo> = candidates.iter().collect();
    for heuristic in heuristics {
        let matched: Vec<&TargetInfo> = survivors
            .iter()
            .copied()
            .filter(|target| heuristic.matches(context, target))
            .collect();

        match matched.len() {
            0 => tracing::debug!("heuristic {} matched nothing, skipping", heuristic.name()),
            1 => {
                let chosen = matched[0];
                tracing::debug!("heuristic {} selected {}", heuristic.name(), chosen.label);
                return Some(chosen.clone());
            }
            count => {
                tracing::debug!(
                    "heuristic {} narrowed {} candidates to {}",
                    heuristic.name(),
                    survivors.len(),
                    count
                );
                survivors = matched;
            }
        }
    }

    most_recently_synced(&survivors).cloned()
}

/// Latest `sync_time` wins, `None` sorts first, and the first of equal maxima is kept.
fn most_recently_synced<'a>(targets: &[&'a TargetInfo]) -> Option<&'a TargetInfo> {
    targets.iter().copied().reduce(|best, target| {
        if target.sync_time > best.sync_time {
            target
        } else {
            best
        }
    })
}

/// Source paths and labels both use `/`.
pub(crate) fn normalized_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
