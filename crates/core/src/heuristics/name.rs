use super::TestTargetHeuristic;
use crate::types::{SourceContext, TargetInfo, TestSize};

/// Last `/`-separated segment of the target name
fn simple_target_name(target: &TargetInfo) -> &str {
    let name = target.label.name();
    name.rsplit('/').next().unwrap_or(name)
}

/// Matches targets named after the test class (or, for free functions, the file).
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetNameHeuristic;

impl TestTargetHeuristic for TargetNameHeuristic {
    fn name(&self) -> &'static str {
        "target_name"
    }

    fn matches(&self, context: &SourceContext, target: &TargetInfo) -> bool {
        context
            .element
            .class_simple_name()
            .is_some_and(|class| simple_target_name(target) == class)
    }
}

/// Matches targets named after the fully qualified class, e.g. `//pkg:com.pkg.FooTest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualifiedClassNameHeuristic;

impl TestTargetHeuristic for QualifiedClassNameHeuristic {
    fn name(&self) -> &'static str {
        "qualified_class_name"
    }

    fn matches(&self, context: &SourceContext, target: &TargetInfo) -> bool {
        let Some(qualified) = context.element.class_qualified_name() else {
            return false;
        };
        let name = target.label.name();
        name == qualified || name.replace('/', ".") == qualified
    }
}

/// Size-by-name guess for targets that don't declare a size.
///
/// A declared size is used as is. Otherwise the target's simple name is scanned for
/// `small`/`medium`/`large`/`enormous`, and a name without any of them counts as small.
/// Like [`TestSizeHeuristic`](super::TestSizeHeuristic) it only discriminates when the source
/// asks for a size.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoughNameHeuristic;

impl RoughNameHeuristic {
    pub fn guessed_size(target: &TargetInfo) -> TestSize {
        target
            .test_size
            .or_else(|| TestSize::guess_from_name(simple_target_name(target)))
            .unwrap_or(TestSize::DEFAULT_RULE_SIZE)
    }
}

impl TestTargetHeuristic for RoughNameHeuristic {
    fn name(&self) -> &'static str {
        "rough_name"
    }

    fn matches(&self, context: &SourceContext, target: &TargetInfo) -> bool {
        context
            .test_size
            .is_some_and(|wanted| Self::guessed_size(target) == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Label, SourceElement};
    use std::path::PathBuf;

    fn method_in(class: &str) -> SourceContext {
        SourceContext::new(SourceElement::Method {
            file: PathBuf::from("java/com/pkg/FooTest.java"),
            class_name: Some(class.to_string()),
            name: "testBar".to_string(),
        })
    }

    #[test]
    fn test_target_name_uses_simple_names() {
        let ctx = method_in("com.pkg.FooTest");
        let exact = TargetInfo::new(Label::new("java/com/pkg", "FooTest"), "java_test");
        let nested = TargetInfo::new(Label::new("java/com/pkg", "suite/FooTest"), "java_test");
        let other = TargetInfo::new(Label::new("java/com/pkg", "BarTest"), "java_test");

        assert!(TargetNameHeuristic.matches(&ctx, &exact));
        assert!(TargetNameHeuristic.matches(&ctx, &nested));
        assert!(!TargetNameHeuristic.matches(&ctx, &other));
    }

    #[test]
    fn test_target_name_falls_back_to_file_stem() {
        let ctx = SourceContext::new(SourceElement::File {
            path: PathBuf::from("src/parser.rs"),
        });
        let target = TargetInfo::new(Label::new("src", "parser"), "rust_test");
        assert!(TargetNameHeuristic.matches(&ctx, &target));
    }

    #[test]
    fn test_qualified_class_name() {
        let ctx = method_in("com.pkg.FooTest");
        let dotted = TargetInfo::new(Label::new("java", "com.pkg.FooTest"), "java_test");
        let slashed = TargetInfo::new(Label::new("java", "com/pkg/FooTest"), "java_test");
        let simple = TargetInfo::new(Label::new("java", "FooTest"), "java_test");

        assert!(QualifiedClassNameHeuristic.matches(&ctx, &dotted));
        assert!(QualifiedClassNameHeuristic.matches(&ctx, &slashed));
        assert!(!QualifiedClassNameHeuristic.matches(&ctx, &simple));
    }

    #[test]
    fn test_rough_name_guesses_size() {
        let small = TargetInfo::new(Label::new("pkg", "FooTest"), "java_test");
        let medium = TargetInfo::new(Label::new("pkg", "FooMediumTest"), "java_test");
        let declared = TargetInfo::new(Label::new("pkg", "FooMediumTest"), "java_test")
            .with_test_size(TestSize::Large);

        assert_eq!(RoughNameHeuristic::guessed_size(&small), TestSize::Small);
        assert_eq!(RoughNameHeuristic::guessed_size(&medium), TestSize::Medium);
        assert_eq!(RoughNameHeuristic::guessed_size(&declared), TestSize::Large);

        let ctx = method_in("com.pkg.FooTest").with_test_size(TestSize::Medium);
        assert!(RoughNameHeuristic.matches(&ctx, &medium));
        assert!(!RoughNameHeuristic.matches(&ctx, &small));
        assert!(!RoughNameHeuristic.matches(&method_in("com.pkg.FooTest"), &medium));
    }
}
