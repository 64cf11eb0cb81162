use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::label::Label;
use super::target_info::TestSize;

/// The element an action was invoked on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceElement {
    /// A whole source file
    File { path: PathBuf },
    /// A test class (or module) inside a file
    Class { file: PathBuf, qualified_name: String },
    /// A single test method or function
    Method {
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class_name: Option<String>,
        name: String,
    },
    /// A rule call inside a BUILD file
    BuildRule {
        build_file: PathBuf,
        rule_kind: String,
        label: Label,
    },
}

impl SourceElement {
    /// The file containing the element
    pub fn file(&self) -> &Path {
        match self {
            SourceElement::File { path } => path,
            SourceElement::Class { file, .. } | SourceElement::Method { file, .. } => file,
            SourceElement::BuildRule { build_file, .. } => build_file,
        }
    }

    /// Stable identity used to recognize configurations created from this element while their
    /// target is still unknown: the file path, plus `#` and the element name for anything
    /// narrower than a file.
    pub fn element_key(&self) -> String {
        match self {
            SourceElement::File { path } => path.display().to_string(),
            SourceElement::Class {
                file,
                qualified_name,
            } => format!("{}#{}", file.display(), qualified_name),
            SourceElement::Method {
                file,
                class_name: Some(class),
                name,
            } => format!("{}#{}.{}", file.display(), class, name),
            SourceElement::Method {
                file,
                class_name: None,
                name,
            } => format!("{}#{}", file.display(), name),
            SourceElement::BuildRule {
                build_file, label, ..
            } => format!("{}#{}", build_file.display(), label),
        }
    }

    /// Short human-readable name, used for pending configuration names
    pub fn display_name(&self) -> String {
        match self {
            SourceElement::File { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            SourceElement::Class { qualified_name, .. } => {
                simple_name(qualified_name).to_string()
            }
            SourceElement::Method {
                class_name: Some(class),
                name,
                ..
            } => format!("{}.{}", simple_name(class), name),
            SourceElement::Method { name, .. } => name.clone(),
            SourceElement::BuildRule { label, .. } => label.to_string(),
        }
    }

    /// Simple name of the class the element belongs to, falling back to the file stem.
    pub fn class_simple_name(&self) -> Option<String> {
        match self {
            SourceElement::Class { qualified_name, .. } => {
                Some(simple_name(qualified_name).to_string())
            }
            SourceElement::Method {
                class_name: Some(class),
                ..
            } => Some(simple_name(class).to_string()),
            SourceElement::Method { file, .. } | SourceElement::File { path: file } => file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned()),
            SourceElement::BuildRule { .. } => None,
        }
    }

    /// Qualified class name when the element carries one.
    pub fn class_qualified_name(&self) -> Option<&str> {
        match self {
            SourceElement::Class { qualified_name, .. } => Some(qualified_name),
            SourceElement::Method {
                class_name: Some(class),
                ..
            } => Some(class),
            _ => None,
        }
    }
}

/// Last segment of a `.` or `::` separated name
fn simple_name(qualified: &str) -> &str {
    let after_path = qualified.rsplit("::").next().unwrap_or(qualified);
    after_path.rsplit('.').next().unwrap_or(after_path)
}

/// Snapshot of the triggering UI context.
///
/// Captured once, then only read. `modification_stamp` is the editor's modification counter for
/// the file at capture time and takes part in the provider cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
    pub element: SourceElement,
    /// Workspace-relative path of the containing file, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<PathBuf>,
    /// Size requested by the source (e.g. an annotation), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_size: Option<TestSize>,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub has_entry_point: bool,
    #[serde(default)]
    pub modification_stamp: u64,
}

impl SourceContext {
    pub fn new(element: SourceElement) -> Self {
        Self {
            element,
            workspace_path: None,
            test_size: None,
            is_test: false,
            has_entry_point: false,
            modification_stamp: 0,
        }
    }

    pub fn with_workspace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_path = Some(path.into());
        self
    }

    pub fn with_test_size(mut self, size: TestSize) -> Self {
        self.test_size = Some(size);
        self
    }

    pub fn marked_test(mut self) -> Self {
        self.is_test = true;
        self
    }

    pub fn with_entry_point(mut self) -> Self {
        self.has_entry_point = true;
        self
    }

    pub fn with_modification_stamp(mut self, stamp: u64) -> Self {
        self.modification_stamp = stamp;
        self
    }

    /// Workspace-relative path if known, otherwise the element's file path.
    pub fn path(&self) -> &Path {
        self.workspace_path
            .as_deref()
            .unwrap_or_else(|| self.element.file())
    }

    /// Directory of the source file with `/` separators, which is also the package of a
    /// BUILD file living next to it.
    pub fn package_dir(&self) -> String {
        self.path()
            .parent()
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_key_forms() {
        let file = SourceElement::File {
            path: PathBuf::from("pkg/Foo.java"),
        };
        assert_eq!(file.element_key(), "pkg/Foo.java");

        let class = SourceElement::Class {
            file: PathBuf::from("pkg/Foo.java"),
            qualified_name: "com.pkg.Foo".to_string(),
        };
        assert_eq!(class.element_key(), "pkg/Foo.java#com.pkg.Foo");

        let method = SourceElement::Method {
            file: PathBuf::from("pkg/Foo.java"),
            class_name: Some("com.pkg.Foo".to_string()),
            name: "testBar".to_string(),
        };
        assert_eq!(method.element_key(), "pkg/Foo.java#com.pkg.Foo.testBar");
        assert_eq!(method.display_name(), "Foo.testBar");
    }

    #[test]
    fn test_class_simple_name_falls_back_to_file_stem() {
        let method = SourceElement::Method {
            file: PathBuf::from("src/parser.rs"),
            class_name: None,
            name: "test_parse".to_string(),
        };
        assert_eq!(method.class_simple_name().as_deref(), Some("parser"));

        let rust_module = SourceElement::Class {
            file: PathBuf::from("src/lib.rs"),
            qualified_name: "crate::tests".to_string(),
        };
        assert_eq!(rust_module.class_simple_name().as_deref(), Some("tests"));
    }

    #[test]
    fn test_package_dir_prefers_workspace_path() {
        let ctx = SourceContext::new(SourceElement::File {
            path: PathBuf::from("/home/me/ws/pkg/sub/Foo.java"),
        })
        .with_workspace_path("pkg/sub/Foo.java");
        assert_eq!(ctx.package_dir(), "pkg/sub");

        let root = SourceContext::new(SourceElement::File {
            path: PathBuf::from("Foo.java"),
        });
        assert_eq!(root.package_dir(), "");
    }
}
