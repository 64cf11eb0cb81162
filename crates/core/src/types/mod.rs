//! Value types shared by every part of the resolver

pub mod command;
pub mod kind;
pub mod label;
pub mod source;
pub mod target_info;

// Re-export commonly used types
pub use command::{BuildCommand, ExecutorType};
pub use kind::{Kind, KindEntry, KindRegistry, LanguageClass, RuleType};
pub use label::{Label, Repo, TargetPattern};
pub use source::{SourceContext, SourceElement};
pub use target_info::{TargetInfo, TestSize};
