//! Build target labels and target patterns
//!
//! Labels follow the Bazel grammar: `@repo//package/path:name`. The repository part is optional
//! (main workspace), `@@name` denotes a canonical repository, and `//pkg/foo` is shorthand for
//! `//pkg/foo:foo`. Target patterns additionally allow the `all`, `*` and `...` wildcards.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};

const ALL_PACKAGES_BENEATH: &str = "...";
const ALL_RULES: &str = "all";
const ALL_RULES_AND_FILES: &str = "*";
const ALL_TARGETS: &str = "all-targets";

static PACKAGE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-.+@~=,]+$").expect("valid package regex"));

static TARGET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"^[A-Za-z0-9!%\-@^_"#$&'()*+,;<=>?\[\]{|}~/.]+$"##).expect("valid target regex")
});

/// Which repository a label lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Repo {
    Main,
    /// `@name`
    Apparent(String),
    /// `@@name`
    Canonical(String),
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repo::Main => Ok(()),
            Repo::Apparent(name) => write!(f, "@{name}"),
            Repo::Canonical(name) => write!(f, "@@{name}"),
        }
    }
}

/// A fully-qualified reference to a single build target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    repo: Repo,
    package: String,
    name: String,
}

impl Label {
    /// Parses a label. Relative labels (`:name`) are resolved against `//`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidLabel {
            label: text.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty label"));
        }

        let (repo, rest) = split_repo(trimmed).map_err(|reason| invalid(&reason))?;
        let rest = match rest.strip_prefix("//") {
            Some(rest) => rest,
            None if rest.starts_with(':') => rest,
            None => return Err(invalid("labels must start with //, @ or :")),
        };

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => (package.to_string(), name.to_string()),
            None => {
                let implicit = rest.rsplit('/').next().unwrap_or_default().to_string();
                (rest.to_string(), implicit)
            }
        };

        validate_package(&package).map_err(|reason| invalid(&reason))?;
        if name.is_empty() {
            return Err(invalid("empty target name"));
        }
        if is_wildcard(&name) || package.ends_with(ALL_PACKAGES_BENEATH) {
            return Err(invalid("wildcards are not single targets"));
        }
        if !TARGET_NAME.is_match(&name) {
            return Err(invalid("target name contains invalid characters"));
        }

        Ok(Self {
            repo,
            package,
            name,
        })
    }

    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo: Repo::Main,
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Package path without the leading `//`, empty for the root package
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_main_workspace(&self) -> bool {
        self.repo == Repo::Main
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}//{}:{}", self.repo, self.package, self.name)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Label::parse(s)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Label::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Either a single label or a wildcard expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetPattern {
    Label(Label),
    Wildcard(String),
}

impl TargetPattern {
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if let Some(reason) = Self::validate(trimmed) {
            return Err(Error::InvalidLabel {
                label: trimmed.to_string(),
                reason,
            });
        }
        match Label::parse(trimmed) {
            Ok(label) => Ok(TargetPattern::Label(label)),
            Err(_) => Ok(TargetPattern::Wildcard(trimmed.to_string())),
        }
    }

    /// Returns a human-readable error, or `None` if the pattern is well formed.
    pub fn validate(text: &str) -> Option<String> {
        let text = text.strip_prefix('-').unwrap_or(text);
        if text.is_empty() {
            return Some("empty target pattern".to_string());
        }
        let rest = match split_repo(text) {
            Ok((_, rest)) => rest,
            Err(reason) => return Some(reason),
        };
        let Some(rest) = rest.strip_prefix("//") else {
            return Some("target patterns must be absolute (start with //)".to_string());
        };

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => (package, Some(name)),
            None => (rest, None),
        };

        let package = package
            .strip_suffix(ALL_PACKAGES_BENEATH)
            .map(|p| p.trim_end_matches('/'))
            .unwrap_or(package);
        if let Err(reason) = validate_package(package) {
            return Some(reason);
        }

        match name {
            Some("") => Some("empty target name".to_string()),
            Some(name) if is_wildcard(name) || TARGET_NAME.is_match(name) => None,
            Some(name) => Some(format!("invalid target name '{name}'")),
            None => None,
        }
    }

    pub fn as_label(&self) -> Option<&Label> {
        match self {
            TargetPattern::Label(label) => Some(label),
            TargetPattern::Wildcard(_) => None,
        }
    }
}

impl fmt::Display for TargetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPattern::Label(label) => label.fmt(f),
            TargetPattern::Wildcard(text) => f.write_str(text),
        }
    }
}

fn split_repo(text: &str) -> std::result::Result<(Repo, &str), String> {
    if let Some(rest) = text.strip_prefix("@@") {
        let (name, rest) = rest
            .split_once("//")
            .ok_or_else(|| "missing // after repository".to_string())?;
        return Ok((Repo::Canonical(name.to_string()), &text[text.len() - rest.len() - 2..]));
    }
    if let Some(rest) = text.strip_prefix('@') {
        let (name, rest) = rest
            .split_once("//")
            .ok_or_else(|| "missing // after repository".to_string())?;
        let repo = if name.is_empty() {
            Repo::Main
        } else {
            Repo::Apparent(name.to_string())
        };
        return Ok((repo, &text[text.len() - rest.len() - 2..]));
    }
    Ok((Repo::Main, text))
}

fn validate_package(package: &str) -> std::result::Result<(), String> {
    if package.is_empty() {
        return Ok(());
    }
    if package.starts_with('/') || package.ends_with('/') {
        return Err("package path must not start or end with /".to_string());
    }
    for segment in package.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(format!("invalid package segment '{segment}'"));
        }
        if !PACKAGE_SEGMENT.is_match(segment) {
            return Err(format!("invalid characters in package segment '{segment}'"));
        }
    }
    Ok(())
}

fn is_wildcard(name: &str) -> bool {
    matches!(name, ALL_RULES | ALL_RULES_AND_FILES | ALL_TARGETS)
}
