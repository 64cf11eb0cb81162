//! BUILD file rule lookup using tree-sitter-starlark

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{Error, Result};
use crate::types::{Label, SourceElement};

/// A named rule call and the lines it spans (1-based, inclusive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRuleCall {
    pub kind: String,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl BuildRuleCall {
    fn contains(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

pub struct BuildFileLocator {
    parser: Parser,
}

impl BuildFileLocator {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_starlark::LANGUAGE.into())
            .map_err(|e| Error::TreeSitterError(format!("Failed to set Starlark language: {e}")))?;
        Ok(Self { parser })
    }

    /// Every call with a `name` argument, in file order. Syntax errors elsewhere in the file
    /// don't hide the rules that did parse.
    pub fn rules(&mut self, content: &str) -> Result<Vec<BuildRuleCall>> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| Error::ParseError("Failed to parse BUILD file".to_string()))?;
        if tree.root_node().has_error() {
            tracing::debug!("BUILD file contains syntax errors");
        }

        let mut rules = Vec::new();
        collect_calls(&tree.root_node(), content, &mut rules);
        Ok(rules)
    }

    /// The innermost named rule call spanning `line` in the BUILD file of `package`.
    pub fn locate(
        &mut self,
        package: &str,
        build_file: &Path,
        content: &str,
        line: usize,
    ) -> Result<Option<SourceElement>> {
        let rule = self
            .rules(content)?
            .into_iter()
            .filter(|rule| rule.contains(line))
            .min_by_key(|rule| rule.end_line - rule.start_line);

        Ok(rule.map(|rule| SourceElement::BuildRule {
            build_file: build_file.to_path_buf(),
            label: Label::new(package, rule.name),
            rule_kind: rule.kind,
        }))
    }
}

fn collect_calls(node: &Node, source: &str, rules: &mut Vec<BuildRuleCall>) {
    if node.kind() == "call" {
        if let Some(rule) = rule_call(node, source) {
            rules.push(rule);
        }
    }
    for child in node.children(&mut node.walk()) {
        collect_calls(&child, source, rules);
    }
}

fn rule_call(node: &Node, source: &str) -> Option<BuildRuleCall> {
    let function = node.child_by_field_name("function")?;
    let kind = function.utf8_text(source.as_bytes()).ok()?;
    let arguments = node.child_by_field_name("arguments")?;

    let name = arguments
        .children(&mut arguments.walk())
        .filter(|arg| arg.kind() == "keyword_argument")
        .find_map(|arg| {
            let key = arg.child_by_field_name("name")?;
            if key.utf8_text(source.as_bytes()).ok()? != "name" {
                return None;
            }
            let value = arg.child_by_field_name("value")?;
            if value.kind() != "string" {
                return None;
            }
            let text = value.utf8_text(source.as_bytes()).ok()?;
            Some(text.trim_matches('"').trim_matches('\'').to_string())
        })?;

    Some(BuildRuleCall {
        kind: kind.to_string(),
        name,
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD: &str = r#"
load("@rules_java//java:defs.bzl", "java_library", "java_test")

java_library(
    name = "foo",
    srcs = glob(["*.java"], exclude = ["*Test.java"]),
)

java_test(
    name = "FooTest",
    size = "small",
    srcs = ["FooTest.java"],
    deps = [":foo"],
)
"#;

    #[test]
    fn test_rules_in_file_order() {
        let mut locator = BuildFileLocator::new().unwrap();
        let rules = locator.rules(BUILD).unwrap();
        let names: Vec<_> = rules.iter().map(|r| (r.kind.as_str(), r.name.as_str())).collect();
        assert_eq!(names, vec![("java_library", "foo"), ("java_test", "FooTest")]);
        assert_eq!(rules[1].start_line, 9);
        assert_eq!(rules[1].end_line, 14);
    }

    #[test]
    fn test_locate_rule_under_line() {
        let mut locator = BuildFileLocator::new().unwrap();
        let path = Path::new("java/com/foo/BUILD");

        match locator.locate("java/com/foo", path, BUILD, 11).unwrap() {
            Some(SourceElement::BuildRule {
                rule_kind, label, ..
            }) => {
                assert_eq!(rule_kind, "java_test");
                assert_eq!(label.to_string(), "//java/com/foo:FooTest");
            }
            other => panic!("unexpected {other:?}"),
        }

        // The glob() call inside java_library has no name; the rule around it wins
        match locator.locate("java/com/foo", path, BUILD, 6).unwrap() {
            Some(SourceElement::BuildRule { rule_kind, .. }) => {
                assert_eq!(rule_kind, "java_library")
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(locator.locate("java/com/foo", path, BUILD, 2).unwrap().is_none());
        assert!(locator.locate("java/com/foo", path, BUILD, 8).unwrap().is_none());
    }
}
