//! Element locators
//!
//! Hosts without a language model of their own use these to turn a `file:line` position into a
//! [`SourceContext`]: the BUILD rule under the cursor, the Rust test function or module around a
//! line, or the JVM test method or class in a source file.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{SourceContext, SourceElement};

mod build_file;
mod jvm_source;
mod rust_source;

pub use build_file::{BuildFileLocator, BuildRuleCall};
pub use jvm_source::JvmSourceLocator;
pub use rust_source::RustSourceLocator;

const BUILD_FILE_NAMES: &[&str] = &["BUILD", "BUILD.bazel"];

pub fn is_build_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| BUILD_FILE_NAMES.contains(&name))
}

/// Captures the source context at `line` (1-based) of `file`, or of the whole file.
pub fn locate(workspace_root: &Path, file: &Path, line: Option<usize>) -> Result<SourceContext> {
    let content = std::fs::read_to_string(file)?;
    locate_in(workspace_root, file, &content, line)
}

/// Same as [`locate`] with the file content already loaded.
pub fn locate_in(
    workspace_root: &Path,
    file: &Path,
    content: &str,
    line: Option<usize>,
) -> Result<SourceContext> {
    let relative = workspace_relative(workspace_root, file);
    let extension = file.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let mut context = if is_build_file(file) {
        let package = relative
            .parent()
            .map(|dir| crate::heuristics::normalized_path(dir))
            .unwrap_or_default();
        let element = match line {
            Some(line) => BuildFileLocator::new()?.locate(&package, file, content, line)?,
            None => None,
        };
        SourceContext::new(element.unwrap_or_else(|| SourceElement::File {
            path: file.to_path_buf(),
        }))
    } else if extension == "rs" {
        RustSourceLocator::new()?.locate(file, content, line)?
    } else if JvmSourceLocator::handles(extension) {
        JvmSourceLocator::locate(file, content, line)
    } else {
        let mut context = SourceContext::new(SourceElement::File {
            path: file.to_path_buf(),
        });
        context.is_test = looks_like_test_file(file);
        context
    };

    context.workspace_path = Some(relative);
    context.modification_stamp = content_stamp(content);
    tracing::debug!("located {} in {}", context.element.element_key(), file.display());
    Ok(context)
}

/// `file` relative to `workspace_root`, or unchanged if it lies outside of it.
pub fn workspace_relative(workspace_root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(workspace_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| file.to_path_buf())
}

/// Naming conventions of test sources across languages
pub fn looks_like_test_file(file: &Path) -> bool {
    let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    stem.ends_with("Test")
        || stem.ends_with("Tests")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
        || stem.starts_with("test_")
}

/// Leading 8 bytes of the content's md5 digest
fn content_stamp(content: &str) -> u64 {
    let md5::Digest(bytes) = md5::compute(content.as_bytes());
    let [b0, b1, b2, b3, b4, b5, b6, b7, ..] = bytes;
    u64::from_le_bytes([b0, b1, b2, b3, b4, b5, b6, b7])
}
