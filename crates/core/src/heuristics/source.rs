use super::{TestTargetHeuristic, normalized_path};
use crate::types::{SourceContext, TargetInfo};

/// Matches targets that list the source file among their sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceFileHeuristic;

impl TestTargetHeuristic for SourceFileHeuristic {
    fn name(&self) -> &'static str {
        "source_file"
    }

    fn matches(&self, context: &SourceContext, target: &TargetInfo) -> bool {
        let path = normalized_path(context.path());
        target.sources.iter().any(|source| *source == path)
    }
}

/// Matches targets declared in the BUILD file next to the source.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageHeuristic;

impl TestTargetHeuristic for PackageHeuristic {
    fn name(&self) -> &'static str {
        "package"
    }

    fn matches(&self, context: &SourceContext, target: &TargetInfo) -> bool {
        target.label.is_main_workspace() && target.label.package() == context.package_dir()
    }
}
