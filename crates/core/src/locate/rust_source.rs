//! Rust test lookup using tree-sitter-rust

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{Error, Result};
use crate::types::{SourceContext, SourceElement};

#[derive(Debug, Clone)]
struct TestFunction {
    module_path: Vec<String>,
    name: String,
    start_line: usize,
    end_line: usize,
}

#[derive(Debug, Clone)]
struct TestModule {
    module_path: Vec<String>,
    start_line: usize,
    end_line: usize,
}

#[derive(Debug, Default)]
struct FileOutline {
    functions: Vec<TestFunction>,
    modules: Vec<TestModule>,
    has_main: bool,
}

pub struct RustSourceLocator {
    parser: Parser,
}

impl RustSourceLocator {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| Error::TreeSitterError(format!("Failed to set language: {e}")))?;
        Ok(Self { parser })
    }

    /// The test function or test module around `line`, falling back to the file itself.
    pub fn locate(&mut self, file: &Path, content: &str, line: Option<usize>) -> Result<SourceContext> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| Error::ParseError("Failed to parse Rust source".to_string()))?;

        let mut outline = FileOutline::default();
        let mut module_path = Vec::new();
        visit(&tree.root_node(), content, &mut module_path, &mut outline);

        let element = line
            .and_then(|line| element_at(file, &outline, line))
            .unwrap_or_else(|| SourceElement::File {
                path: file.to_path_buf(),
            });

        let mut context = SourceContext::new(element);
        context.is_test = !outline.functions.is_empty()
            || super::looks_like_test_file(file)
            || file.components().any(|c| c.as_os_str() == "tests");
        context.has_entry_point = outline.has_main;
        Ok(context)
    }
}

fn element_at(file: &Path, outline: &FileOutline, line: usize) -> Option<SourceElement> {
    if let Some(function) = outline
        .functions
        .iter()
        .find(|f| f.start_line <= line && line <= f.end_line)
    {
        return Some(SourceElement::Method {
            file: file.to_path_buf(),
            class_name: (!function.module_path.is_empty()).then(|| function.module_path.join("::")),
            name: function.name.clone(),
        });
    }

    outline
        .modules
        .iter()
        .filter(|m| m.start_line <= line && line <= m.end_line)
        .min_by_key(|m| m.end_line - m.start_line)
        .map(|module| SourceElement::Class {
            file: file.to_path_buf(),
            qualified_name: module.module_path.join("::"),
        })
}

fn visit(node: &Node, source: &str, module_path: &mut Vec<String>, outline: &mut FileOutline) {
    for child in node.children(&mut node.walk()) {
        match child.kind() {
            "function_item" => {
                let Some(name) = item_name(&child, source) else {
                    continue;
                };
                if module_path.is_empty() && name == "main" {
                    outline.has_main = true;
                }
                if has_attribute(&child, source, &["#[test]", "#[tokio::test"]) {
                    outline.functions.push(TestFunction {
                        module_path: module_path.clone(),
                        name,
                        start_line: start_with_attributes(&child) + 1,
                        end_line: child.end_position().row + 1,
                    });
                }
            }
            "mod_item" => {
                let Some(name) = item_name(&child, source) else {
                    continue;
                };
                let Some(body) = child.child_by_field_name("body") else {
                    continue;
                };
                module_path.push(name);
                let before = outline.functions.len();
                visit(&body, source, module_path, outline);
                let contains_tests = outline.functions.len() > before;
                if contains_tests || has_attribute(&child, source, &["cfg(test)"]) {
                    outline.modules.push(TestModule {
                        module_path: module_path.clone(),
                        start_line: start_with_attributes(&child) + 1,
                        end_line: child.end_position().row + 1,
                    });
                }
                module_path.pop();
            }
            _ => {}
        }
    }
}

fn item_name(node: &Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")?
        .utf8_text(source.as_bytes())
        .ok()
        .map(str::to_string)
}

/// Scans the attributes directly above `node`, skipping comments.
fn has_attribute(node: &Node, source: &str, needles: &[&str]) -> bool {
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.kind() == "attribute_item" {
            if let Ok(text) = s.utf8_text(source.as_bytes()) {
                if needles.iter().any(|needle| text.contains(needle)) {
                    return true;
                }
            }
        } else if s.kind() != "line_comment" && s.kind() != "block_comment" {
            break;
        }
        sibling = s.prev_sibling();
    }
    false
}

/// Row of the first attribute belonging to `node`, so a cursor on `#[test]` counts.
fn start_with_attributes(node: &Node) -> usize {
    let mut start = node.start_position().row;
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.kind() != "attribute_item" {
            break;
        }
        start = s.start_position().row;
        sibling = s.prev_sibling();
    }
    start
}
