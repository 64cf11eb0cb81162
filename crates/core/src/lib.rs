//! runtarget-core - Run target resolution for build-graph aware editors
//!
//! This crate provides functionality to:
//! - Map a source element (file, class, method or BUILD rule) to the build target that runs it
//! - Rank candidate targets with an ordered chain of heuristics
//! - Hand out configuration contexts that are known, still pending, or waiting for a choice
//! - Keep run configurations consistent while background lookups complete or get superseded
pub mod config;
pub mod configuration;
pub mod context;
pub mod error;
pub mod future;
pub mod heuristics;
pub mod locate;
pub mod lookup;
pub mod manager;
pub mod producer;
pub mod providers;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Error, ErrorReporter, Result, report};
pub use types::*;

pub use config::ResolverSettings;
pub use configuration::RunConfiguration;
pub use context::{ResolveEnv, RunConfigurationContext, TargetChooser};
pub use future::{ListenableFuture, Promise, ProgressIndicator};
pub use heuristics::HeuristicRegistry;
pub use lookup::TargetLookup;
pub use manager::{RunManager, SyncReport};
pub use producer::{RunConfigurationProducer, UiContext};
pub use providers::{ContextProvider, ProviderRegistry, ProviderServices};
