use std::sync::Arc;

use super::{ContextProvider, ProviderServices};
use crate::context::{RunConfigurationContext, TestContextBuilder};
use crate::error::Result;
use crate::producer::UiContext;
use crate::types::{ExecutorType, RuleType, SourceElement, TargetInfo};

/// Fallback path for test sources.
///
/// Recognizing a test source is cheap; finding its target is not. The provider answers right
/// away with a pending context whose lookup runs in the background: candidates for the file,
/// narrowed to test rules and then by the heuristic chain, with web test wrappers substituted
/// when there are any.
pub struct TestSourceProvider {
    services: ProviderServices,
}

impl TestSourceProvider {
    pub fn new(services: ProviderServices) -> Self {
        Self { services }
    }
}

impl ContextProvider for TestSourceProvider {
    fn name(&self) -> &'static str {
        "test_source"
    }

    fn context(&self, ui: &UiContext) -> Result<Option<RunConfigurationContext>> {
        let source = &ui.source;
        if !source.is_test || matches!(source.element, SourceElement::BuildRule { .. }) {
            return Ok(None);
        }

        let kinds = Arc::clone(&self.services.kinds);
        let heuristics = Arc::clone(&self.services.heuristics);
        let captured = source.clone();
        let target = self
            .services
            .lookup
            .targets_for_source(source)
            .map(move |candidates| {
                let tests: Vec<TargetInfo> = candidates
                    .into_iter()
                    .filter(|t| {
                        kinds.guess_rule_type(&t.kind) == RuleType::Test
                            && !kinds.is_web_test(&t.kind)
                    })
                    .collect();
                heuristics.choose_target(&captured, &tests)
            });

        TestContextBuilder::new(source.element.clone(), ExecutorType::defaults())
            .build_system(self.services.build_system.as_str())
            .flag_names(self.services.flag_names.clone())
            .max_unwrap_depth(self.services.max_unwrap_depth)
            .test_filter(test_filter(ui).as_deref())
            .description(description(&source.element))
            .target_future(target)
            .web_test_wrappers(
                Arc::clone(&self.services.lookup),
                Arc::clone(&self.services.kinds),
            )
            .build()
            .map(Some)
    }
}

/// Selected test nodes joined with `|`, otherwise the element's own test name.
///
/// Methods are addressed as `Class#method`, or `module::function` in Rust sources.
pub fn test_filter(ui: &UiContext) -> Option<String> {
    if !ui.selected_tests.is_empty() {
        return Some(ui.selected_tests.join("|"));
    }
    let element = &ui.source.element;
    let rust = element.file().extension().is_some_and(|ext| ext == "rs");
    match element {
        SourceElement::Method {
            class_name: Some(class),
            name,
            ..
        } if rust => Some(format!("{class}::{name}")),
        SourceElement::Method {
            class_name: Some(class),
            name,
            ..
        } => Some(format!("{class}#{name}")),
        SourceElement::Method { name, .. } => Some(name.clone()),
        SourceElement::Class { qualified_name, .. } => Some(qualified_name.clone()),
        SourceElement::File { .. } | SourceElement::BuildRule { .. } => None,
    }
}

fn description(element: &SourceElement) -> Option<String> {
    match element {
        SourceElement::Method { .. } | SourceElement::Class { .. } => Some(element.display_name()),
        SourceElement::File { .. } | SourceElement::BuildRule { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceContext;
    use std::path::PathBuf;

    fn method(file: &str, class: Option<&str>, name: &str) -> UiContext {
        UiContext::new(SourceContext::new(SourceElement::Method {
            file: PathBuf::from(file),
            class_name: class.map(str::to_string),
            name: name.to_string(),
        }))
    }

    #[test]
    fn test_filter_forms() {
        assert_eq!(
            test_filter(&method("pkg/FooTest.java", Some("com.pkg.FooTest"), "testBar")).as_deref(),
            Some("com.pkg.FooTest#testBar")
        );
        assert_eq!(
            test_filter(&method("src/parser.rs", Some("tests"), "test_parse")).as_deref(),
            Some("tests::test_parse")
        );
        assert_eq!(
            test_filter(&method("foo_test.go", None, "TestFoo")).as_deref(),
            Some("TestFoo")
        );

        let class = UiContext::new(SourceContext::new(SourceElement::Class {
            file: PathBuf::from("pkg/FooTest.java"),
            qualified_name: "com.pkg.FooTest".to_string(),
        }));
        assert_eq!(test_filter(&class).as_deref(), Some("com.pkg.FooTest"));

        let file = UiContext::new(SourceContext::new(SourceElement::File {
            path: PathBuf::from("pkg/FooTest.java"),
        }));
        assert_eq!(test_filter(&file), None);
    }

    #[test]
    fn test_selected_tests_win() {
        let ui = method("pkg/FooTest.java", Some("com.pkg.FooTest"), "testBar")
            .with_selected_tests(["com.pkg.FooTest#testA", "com.pkg.FooTest#testB"]);
        assert_eq!(
            test_filter(&ui).as_deref(),
            Some("com.pkg.FooTest#testA|com.pkg.FooTest#testB")
        );
    }
}
