use super::TestTargetHeuristic;
use crate::types::{SourceContext, TargetInfo, TestSize};

/// Matches targets whose declared size equals the size the source asks for.
///
/// Targets without a `size` attribute count as [`TestSize::DEFAULT_RULE_SIZE`]. Sources that
/// don't ask for a size can't be discriminated, so nothing matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestSizeHeuristic;

impl TestTargetHeuristic for TestSizeHeuristic {
    fn name(&self) -> &'static str {
        "test_size"
    }

    fn matches(&self, context: &SourceContext, target: &TargetInfo) -> bool {
        let Some(wanted) = context.test_size else {
            return false;
        };
        target.test_size.unwrap_or(TestSize::DEFAULT_RULE_SIZE) == wanted
    }
}
