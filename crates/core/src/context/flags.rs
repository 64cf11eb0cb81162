//! Flag list modifications
//!
//! A context never replaces a configuration's flags wholesale; it applies a list of
//! [`FlagModification`]s to whatever flags the configuration already has. Every modification is
//! idempotent, because a configuration can be set up from the same context more than once.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEST_FILTER_FLAG: &str = "--test_filter";
pub const DEFAULT_TEST_ENV_FLAG: &str = "--test_env";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlagModification {
    /// Appends `flag` unless it is already present
    AddIfAbsent { flag: String },
    /// Drops every `flag=...` entry, then adds `flag=value` when a value is set
    TestFilter { flag: String, value: Option<String> },
    /// Adds `flag=value` unless it is already present
    TestEnv { flag: String, value: String },
}

impl FlagModification {
    pub fn add_if_absent(flag: impl Into<String>) -> Self {
        FlagModification::AddIfAbsent { flag: flag.into() }
    }

    /// Test filter using the default flag name
    pub fn test_filter(value: Option<&str>) -> Self {
        FlagModification::TestFilter {
            flag: DEFAULT_TEST_FILTER_FLAG.to_string(),
            value: value.map(str::to_string),
        }
    }

    /// Test environment entry using the default flag name
    pub fn test_env(value: impl Into<String>) -> Self {
        FlagModification::TestEnv {
            flag: DEFAULT_TEST_ENV_FLAG.to_string(),
            value: value.into(),
        }
    }

    pub fn is_test_filter(&self) -> bool {
        matches!(self, FlagModification::TestFilter { .. })
    }

    pub fn apply(&self, flags: &mut Vec<String>) {
        match self {
            FlagModification::AddIfAbsent { flag } => push_if_absent(flags, flag.clone()),
            FlagModification::TestFilter { flag, value } => {
                flags.retain(|existing| !is_flag(existing, flag));
                if let Some(value) = value {
                    flags.push(format_flag(flag, value));
                }
            }
            FlagModification::TestEnv { flag, value } => {
                push_if_absent(flags, format_flag(flag, value))
            }
        }
    }

    /// Whether `flags` already reflect this modification.
    ///
    /// A test filter without a value only matches flag lists without any filter.
    pub fn matches(&self, flags: &[String]) -> bool {
        match self {
            FlagModification::AddIfAbsent { flag } => flags.contains(flag),
            FlagModification::TestFilter { flag, value: None } => {
                !flags.iter().any(|existing| is_flag(existing, flag))
            }
            FlagModification::TestFilter {
                flag,
                value: Some(value),
            } => flags.contains(&format_flag(flag, value)),
            FlagModification::TestEnv { flag, value } => flags.contains(&format_flag(flag, value)),
        }
    }
}

/// Names of the flags the modifications use, configurable per build system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagNames {
    pub test_filter: String,
    pub test_env: String,
}

impl Default for FlagNames {
    fn default() -> Self {
        Self {
            test_filter: DEFAULT_TEST_FILTER_FLAG.to_string(),
            test_env: DEFAULT_TEST_ENV_FLAG.to_string(),
        }
    }
}

impl FlagNames {
    pub fn test_filter(&self, value: Option<&str>) -> FlagModification {
        FlagModification::TestFilter {
            flag: self.test_filter.clone(),
            value: value.map(str::to_string),
        }
    }

    pub fn test_env(&self, value: impl Into<String>) -> FlagModification {
        FlagModification::TestEnv {
            flag: self.test_env.clone(),
            value: value.into(),
        }
    }
}

fn push_if_absent(flags: &mut Vec<String>, flag: String) {
    if !flags.contains(&flag) {
        flags.push(flag);
    }
}

fn is_flag(existing: &str, flag: &str) -> bool {
    existing == flag
        || existing
            .strip_prefix(flag)
            .is_some_and(|rest| rest.starts_with('='))
}

fn format_flag(flag: &str, value: &str) -> String {
    format!("{}={}", flag, encode_param(value))
}

/// Quotes a flag value for the build tool's command line.
///
/// Values without whitespace, quotes or backslashes pass through unchanged.
pub fn encode_param(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '\\');
    if !needs_quoting {
        return value.to_string();
    }

    let mut encoded = String::with_capacity(value.len() + 2);
    encoded.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            encoded.push('\\');
        }
        encoded.push(c);
    }
    encoded.push('"');
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_applied_twice_equals_once() {
        let modification = FlagModification::test_filter(Some("com.pkg.FooTest#testBar$"));
        let mut once = flags(&["--config=ci", "--test_filter=Old"]);
        modification.apply(&mut once);
        let mut twice = once.clone();
        modification.apply(&mut twice);

        assert_eq!(once, twice);
        assert_eq!(once, flags(&["--config=ci", "--test_filter=com.pkg.FooTest#testBar$"]));
    }

    #[test]
    fn test_filter_none_removes_existing_filter() {
        let modification = FlagModification::test_filter(None);
        let mut list = flags(&["--test_filter=Old", "--test_output=errors"]);
        assert!(!modification.matches(&list));
        modification.apply(&mut list);
        assert_eq!(list, flags(&["--test_output=errors"]));
        assert!(modification.matches(&list));
    }

    #[test]
    fn test_filter_prefix_is_exact() {
        let modification = FlagModification::test_filter(Some("Foo"));
        let mut list = flags(&["--test_filter_extra=1"]);
        modification.apply(&mut list);
        assert_eq!(list, flags(&["--test_filter_extra=1", "--test_filter=Foo"]));
    }

    #[test]
    fn test_env_and_add_if_absent_are_idempotent() {
        let env = FlagModification::test_env("KEY=some value");
        let add = FlagModification::add_if_absent("--nocache_test_results");
        let mut list = Vec::new();
        for _ in 0..2 {
            env.apply(&mut list);
            add.apply(&mut list);
        }
        assert_eq!(
            list,
            flags(&["--test_env=\"KEY=some value\"", "--nocache_test_results"])
        );
        assert!(env.matches(&list));
        assert!(add.matches(&list));
    }

    #[test]
    fn test_encode_param() {
        assert_eq!(encode_param("Foo#bar"), "Foo#bar");
        assert_eq!(encode_param("a b"), "\"a b\"");
        assert_eq!(encode_param("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(encode_param(""), "\"\"");
    }

    #[test]
    fn test_custom_flag_names() {
        let names = FlagNames {
            test_filter: "--filter".to_string(),
            test_env: "--env".to_string(),
        };
        let mut list = Vec::new();
        names.test_filter(Some("x")).apply(&mut list);
        names.test_env("A=1").apply(&mut list);
        assert_eq!(list, flags(&["--filter=x", "--env=A=1"]));
    }
}
