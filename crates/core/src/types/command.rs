use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::kind::RuleType;

/// The build-tool command a run configuration invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildCommand {
    Test,
    Run,
    Build,
    Coverage,
    Info,
}

impl BuildCommand {
    /// Command used when a rule is run directly from its BUILD file.
    pub fn for_rule_type(rule_type: RuleType) -> Option<Self> {
        match rule_type {
            RuleType::Binary => Some(BuildCommand::Run),
            RuleType::Test => Some(BuildCommand::Test),
            RuleType::Library | RuleType::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildCommand::Test => "test",
            BuildCommand::Run => "run",
            BuildCommand::Build => "build",
            BuildCommand::Coverage => "coverage",
            BuildCommand::Info => "info",
        }
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the host intends to execute a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorType {
    Run,
    Debug,
    Coverage,
    FastBuild,
}

impl ExecutorType {
    /// Executors a plain test or binary context supports
    pub fn defaults() -> BTreeSet<ExecutorType> {
        BTreeSet::from([ExecutorType::Run, ExecutorType::Debug, ExecutorType::Coverage])
    }

    pub fn all() -> BTreeSet<ExecutorType> {
        BTreeSet::from([
            ExecutorType::Run,
            ExecutorType::Debug,
            ExecutorType::Coverage,
            ExecutorType::FastBuild,
        ])
    }
}
