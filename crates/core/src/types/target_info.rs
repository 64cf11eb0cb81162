use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::label::Label;

/// Test size classification as declared by the `size` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSize {
    Small,
    Medium,
    Large,
    Enormous,
}

/// Substrings scanned, in order, when guessing a size from a rule name.
const SIZE_NAME_TABLE: &[(&str, TestSize)] = &[
    ("small", TestSize::Small),
    ("medium", TestSize::Medium),
    ("large", TestSize::Large),
    ("enormous", TestSize::Enormous),
];

impl TestSize {
    /// Size of a test rule that doesn't declare one
    pub const DEFAULT_RULE_SIZE: TestSize = TestSize::Small;

    /// First table substring found in `name` (case-insensitive), `None` if unspecified.
    pub fn guess_from_name(name: &str) -> Option<TestSize> {
        let lower = name.to_lowercase();
        SIZE_NAME_TABLE
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, size)| *size)
    }

    pub fn parse(text: &str) -> Option<TestSize> {
        match text.to_lowercase().as_str() {
            "small" => Some(TestSize::Small),
            "medium" => Some(TestSize::Medium),
            "large" => Some(TestSize::Large),
            "enormous" => Some(TestSize::Enormous),
            _ => None,
        }
    }
}

/// Identity of a build target as reported by the build tool.
///
/// Two `TargetInfo`s are equal when their labels are equal; the other fields are
/// descriptive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfo {
    pub label: Label,
    /// Rule kind string, e.g. `java_test`
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_size: Option<TestSize>,
    /// Last sync that reported this target, in sync-clock units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_time: Option<u64>,
    /// Workspace-relative source files of the target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl TargetInfo {
    pub fn new(label: Label, kind: impl Into<String>) -> Self {
        Self {
            label,
            kind: kind.into(),
            test_size: None,
            sync_time: None,
            sources: Vec::new(),
        }
    }

    pub fn with_test_size(mut self, size: TestSize) -> Self {
        self.test_size = Some(size);
        self
    }

    pub fn with_sync_time(mut self, sync_time: u64) -> Self {
        self.sync_time = Some(sync_time);
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }
}

impl PartialEq for TargetInfo {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for TargetInfo {}

impl Hash for TargetInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_size_from_name() {
        assert_eq!(TestSize::guess_from_name("FooSmallTest"), Some(TestSize::Small));
        assert_eq!(TestSize::guess_from_name("integration_LARGE"), Some(TestSize::Large));
        assert_eq!(TestSize::guess_from_name("FooTest"), None);
    }

    #[test]
    fn test_guess_size_first_table_hit_wins() {
        // "small" is scanned before "large"
        assert_eq!(
            TestSize::guess_from_name("large_and_small_test"),
            Some(TestSize::Small)
        );
    }

    #[test]
    fn test_equality_is_by_label() {
        let a = TargetInfo::new(Label::new("pkg", "FooTest"), "java_test").with_sync_time(1);
        let b = TargetInfo::new(Label::new("pkg", "FooTest"), "kt_jvm_test").with_sync_time(9);
        assert_eq!(a, b);
    }

    #[test]
    fn test_deserialize_minimal_entry() {
        let info: TargetInfo =
            serde_json::from_str(r#"{"label": "//pkg:FooTest", "kind": "java_test"}"#).unwrap();
        assert_eq!(info.label.to_string(), "//pkg:FooTest");
        assert_eq!(info.test_size, None);
        assert!(info.sources.is_empty());
    }
}
