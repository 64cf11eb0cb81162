//! Line-oriented lookup for Java and Kotlin sources
//!
//! There is no JVM grammar in the dependency set, so this reads declarations with regexes. It is
//! enough for one top-level test class per file, which is the convention the build rules assume.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::types::{SourceContext, SourceElement, TestSize};

static PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*package\s+([A-Za-z_][\w.]*)\s*;?").expect("valid package regex")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected|abstract|final|open|internal|data)\s+)*(?:class|object)\s+([A-Za-z_]\w*)")
        .expect("valid class regex")
});

static TEST_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(?:org\.junit\.)?(?:Test|ParameterizedTest)\b").expect("valid annotation regex"));

static SIZE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*@(Small|Medium|Large|Enormous)Test\b").expect("valid size annotation regex")
});

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bvoid|\bfun)\s+`?([A-Za-z_][\w ]*?)`?\s*\(").expect("valid method regex")
});

static MAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:static\s+void\s+main\s*\(|^\s*fun\s+main\s*\()").expect("valid main regex")
});

#[derive(Debug, Clone)]
struct TestMethod {
    name: String,
    annotation_line: usize,
}

pub struct JvmSourceLocator;

impl JvmSourceLocator {
    pub fn handles(extension: &str) -> bool {
        matches!(extension, "java" | "kt")
    }

    pub fn locate(file: &Path, content: &str, line: Option<usize>) -> SourceContext {
        let lines: Vec<&str> = content.lines().collect();

        let package = lines
            .iter()
            .find_map(|l| PACKAGE.captures(l).map(|c| c[1].to_string()));
        let class = lines
            .iter()
            .enumerate()
            .find_map(|(i, l)| CLASS.captures(l).map(|c| (i + 1, c[1].to_string())));
        let methods = test_methods(&lines);
        let size = lines.iter().find_map(|l| {
            SIZE_ANNOTATION
                .captures(l)
                .and_then(|c| TestSize::parse(&c[1]))
        });

        let qualified = class.as_ref().map(|(_, name)| match &package {
            Some(package) => format!("{package}.{name}"),
            None => name.clone(),
        });

        let element = match (line, class.as_ref(), qualified.as_ref()) {
            (Some(line), Some((class_line, _)), Some(qualified)) if line >= *class_line => {
                // The closest test method starting at or above the cursor
                match methods.iter().rev().find(|m| m.annotation_line <= line) {
                    Some(method) => SourceElement::Method {
                        file: file.to_path_buf(),
                        class_name: Some(qualified.clone()),
                        name: method.name.clone(),
                    },
                    None => SourceElement::Class {
                        file: file.to_path_buf(),
                        qualified_name: qualified.clone(),
                    },
                }
            }
            _ => SourceElement::File {
                path: file.to_path_buf(),
            },
        };

        let mut context = SourceContext::new(element);
        context.is_test = !methods.is_empty() || super::looks_like_test_file(file);
        context.has_entry_point = lines.iter().any(|l| MAIN.is_match(l));
        context.test_size = size;
        context
    }
}

fn test_methods(lines: &[&str]) -> Vec<TestMethod> {
    let mut methods = Vec::new();
    let mut pending: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        if TEST_ANNOTATION.is_match(line) {
            pending.get_or_insert(i + 1);
        }
        if let Some(annotation_line) = pending {
            if let Some(captures) = METHOD.captures(line) {
                methods.push(TestMethod {
                    name: captures[1].trim().to_string(),
                    annotation_line,
                });
                pending = None;
            }
        }
    }
    methods
}
