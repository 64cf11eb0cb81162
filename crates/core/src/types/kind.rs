//! Rule kind classification
//!
//! A [`KindRegistry`] maps rule names (`java_test`, `rust_binary`, ...) to a [`Kind`]. The table is
//! static configuration: a built-in set of common rules plus whatever the settings add. Rule names
//! the table doesn't know are classified by suffix.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// When a rule has a transition applied to it, its kind carries this prefix.
const RULE_NAME_PREFIX_TRANSITION: &str = "_transition_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Test,
    Binary,
    Library,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageClass {
    Java,
    Kotlin,
    Scala,
    Rust,
    Go,
    Python,
    Cc,
    Shell,
    JavaScript,
    Generic,
}

/// A recognized rule name together with its languages and rule type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kind {
    pub kind_string: String,
    pub languages: BTreeSet<LanguageClass>,
    pub rule_type: RuleType,
}

impl Kind {
    pub fn new(kind_string: impl Into<String>, language: LanguageClass, rule_type: RuleType) -> Self {
        Self {
            kind_string: kind_string.into(),
            languages: BTreeSet::from([language]),
            rule_type,
        }
    }

    /// Web test wrappers run another test target inside a browser environment.
    pub fn is_web_test(&self) -> bool {
        self.rule_type == RuleType::Test && self.kind_string.ends_with("web_test")
    }

    pub fn has_language(&self, language: LanguageClass) -> bool {
        self.languages.contains(&language)
    }
}

/// Extra table entry loaded from settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindEntry {
    pub kind: String,
    pub rule_type: RuleType,
    #[serde(default)]
    pub languages: Vec<LanguageClass>,
}

const BUILTIN_KINDS: &[(&str, LanguageClass, RuleType)] = &[
    ("java_test", LanguageClass::Java, RuleType::Test),
    ("java_binary", LanguageClass::Java, RuleType::Binary),
    ("java_library", LanguageClass::Java, RuleType::Library),
    ("java_web_test", LanguageClass::Java, RuleType::Test),
    ("kt_jvm_test", LanguageClass::Kotlin, RuleType::Test),
    ("kt_jvm_binary", LanguageClass::Kotlin, RuleType::Binary),
    ("kt_jvm_library", LanguageClass::Kotlin, RuleType::Library),
    ("scala_test", LanguageClass::Scala, RuleType::Test),
    ("scala_junit_test", LanguageClass::Scala, RuleType::Test),
    ("scala_binary", LanguageClass::Scala, RuleType::Binary),
    ("scala_library", LanguageClass::Scala, RuleType::Library),
    ("rust_test", LanguageClass::Rust, RuleType::Test),
    ("rust_test_suite", LanguageClass::Rust, RuleType::Test),
    ("rust_doc_test", LanguageClass::Rust, RuleType::Test),
    ("rust_binary", LanguageClass::Rust, RuleType::Binary),
    ("rust_library", LanguageClass::Rust, RuleType::Library),
    ("rust_proc_macro", LanguageClass::Rust, RuleType::Library),
    ("go_test", LanguageClass::Go, RuleType::Test),
    ("go_binary", LanguageClass::Go, RuleType::Binary),
    ("go_library", LanguageClass::Go, RuleType::Library),
    ("go_web_test", LanguageClass::Go, RuleType::Test),
    ("py_test", LanguageClass::Python, RuleType::Test),
    ("py_binary", LanguageClass::Python, RuleType::Binary),
    ("py_library", LanguageClass::Python, RuleType::Library),
    ("py_web_test", LanguageClass::Python, RuleType::Test),
    ("cc_test", LanguageClass::Cc, RuleType::Test),
    ("cc_binary", LanguageClass::Cc, RuleType::Binary),
    ("cc_library", LanguageClass::Cc, RuleType::Library),
    ("sh_test", LanguageClass::Shell, RuleType::Test),
    ("sh_binary", LanguageClass::Shell, RuleType::Binary),
    ("sh_library", LanguageClass::Shell, RuleType::Library),
    ("web_test", LanguageClass::Generic, RuleType::Test),
    ("test_suite", LanguageClass::Generic, RuleType::Test),
];

/// Read-only lookup table from rule name to [`Kind`]
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: HashMap<String, Kind>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl KindRegistry {
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for (name, language, rule_type) in BUILTIN_KINDS {
            registry.register(Kind::new(*name, *language, *rule_type));
        }
        registry
    }

    /// Builtin table plus the extra entries from settings. Extras never replace builtins.
    pub fn with_extras(extras: &[KindEntry]) -> Self {
        let mut registry = Self::with_builtin();
        for entry in extras {
            let languages = if entry.languages.is_empty() {
                BTreeSet::from([LanguageClass::Generic])
            } else {
                entry.languages.iter().copied().collect()
            };
            registry.register(Kind {
                kind_string: entry.kind.clone(),
                languages,
                rule_type: entry.rule_type,
            });
        }
        registry
    }

    /// Adds `kind`, or returns the existing kind with the same rule name.
    pub fn register(&mut self, kind: Kind) -> &Kind {
        self.kinds.entry(kind.kind_string.clone()).or_insert(kind)
    }

    pub fn from_rule_name(&self, rule_name: &str) -> Option<&Kind> {
        let rule_name = rule_name
            .strip_prefix(RULE_NAME_PREFIX_TRANSITION)
            .unwrap_or(rule_name);
        self.kinds.get(rule_name)
    }

    /// Known kinds answer from the table; unknown rule names are classified by suffix.
    pub fn guess_rule_type(&self, rule_name: &str) -> RuleType {
        if let Some(kind) = self.from_rule_name(rule_name) {
            return kind.rule_type;
        }
        if is_test_suite(rule_name) || rule_name.ends_with("_test") {
            return RuleType::Test;
        }
        if rule_name.ends_with("_binary") {
            return RuleType::Binary;
        }
        if rule_name.ends_with("_library") {
            return RuleType::Library;
        }
        RuleType::Unknown
    }

    pub fn is_web_test(&self, rule_name: &str) -> bool {
        match self.from_rule_name(rule_name) {
            Some(kind) => kind.is_web_test(),
            None => self.guess_rule_type(rule_name) == RuleType::Test && rule_name.ends_with("web_test"),
        }
    }

    pub fn kinds_for_language(&self, language: LanguageClass) -> Vec<&Kind> {
        let mut kinds: Vec<&Kind> = self
            .kinds
            .values()
            .filter(|k| k.has_language(language))
            .collect();
        kinds.sort_by(|a, b| a.kind_string.cmp(&b.kind_string));
        kinds
    }
}

/// Plain `test_suite` targets and macros producing a test suite
fn is_test_suite(rule_name: &str) -> bool {
    rule_name.ends_with("test_suite") || rule_name.ends_with("test_suites")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = KindRegistry::with_builtin();
        let kind = registry.from_rule_name("java_test").unwrap();
        assert_eq!(kind.rule_type, RuleType::Test);
        assert!(kind.has_language(LanguageClass::Java));
    }

    #[test]
    fn test_transition_prefix_is_stripped() {
        let registry = KindRegistry::with_builtin();
        let kind = registry.from_rule_name("_transition_rust_binary").unwrap();
        assert_eq!(kind.kind_string, "rust_binary");
    }

    #[test]
    fn test_guess_rule_type_by_suffix() {
        let registry = KindRegistry::with_builtin();
        assert_eq!(registry.guess_rule_type("my_custom_test"), RuleType::Test);
        assert_eq!(registry.guess_rule_type("android_test_suites"), RuleType::Test);
        assert_eq!(registry.guess_rule_type("ts_binary"), RuleType::Binary);
        assert_eq!(registry.guess_rule_type("ts_library"), RuleType::Library);
        assert_eq!(registry.guess_rule_type("genrule"), RuleType::Unknown);
    }

    #[test]
    fn test_web_test_detection() {
        let registry = KindRegistry::with_builtin();
        assert!(registry.is_web_test("java_web_test"));
        assert!(registry.is_web_test("closure_web_test"));
        assert!(!registry.is_web_test("java_test"));
    }

    #[test]
    fn test_extras_do_not_override_builtins() {
        let registry = KindRegistry::with_extras(&[
            KindEntry {
                kind: "java_test".to_string(),
                rule_type: RuleType::Binary,
                languages: vec![],
            },
            KindEntry {
                kind: "ios_unit_test".to_string(),
                rule_type: RuleType::Test,
                languages: vec![],
            },
        ]);
        assert_eq!(registry.guess_rule_type("java_test"), RuleType::Test);
        let extra = registry.from_rule_name("ios_unit_test").unwrap();
        assert!(extra.has_language(LanguageClass::Generic));
    }
}
