//! Resolver settings
//!
//! Settings live in `.runtarget.json` files. Every field is optional; a file only overrides what
//! it sets. Files found between the filesystem root and the working directory are layered
//! root-first, so the nearest file wins.

mod merge;
mod settings;

pub use merge::{SettingsMerger, SETTINGS_FILE_NAME};
pub use settings::ResolverSettings;
