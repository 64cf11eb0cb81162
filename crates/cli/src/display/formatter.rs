use runtarget_core::types::{KindRegistry, SourceContext, SourceElement, TargetInfo};
use runtarget_core::RunConfiguration;

use crate::host::TargetIndex;

/// Element kind shown next to a located element
pub fn element_kind(element: &SourceElement) -> &'static str {
    match element {
        SourceElement::File { .. } => "📄 file",
        SourceElement::Class { .. } => "📦 class",
        SourceElement::Method { .. } => "🧪 method",
        SourceElement::BuildRule { .. } => "🔨 build rule",
    }
}

pub fn print_source_context(context: &SourceContext, kinds: &KindRegistry) {
    println!("{} {}", element_kind(&context.element), context.element.display_name());
    println!("   • key: {}", context.element.element_key());
    println!("   • path: {}", context.path().display());
    if let SourceElement::BuildRule { rule_kind, .. } = &context.element {
        println!("   • rule: {} ({:?})", rule_kind, kinds.guess_rule_type(rule_kind));
    }
    if let Some(size) = context.test_size {
        println!("   • size: {size:?}");
    }
    println!("   • test source: {}", context.is_test);
    println!("   • entry point: {}", context.has_entry_point);
}

pub fn print_configuration(config: &RunConfiguration) {
    println!("✅ {}", config.name());
    if let Some(command) = config.command() {
        println!("   • command: {command}");
    }
    for target in config.target_patterns() {
        println!("   • target: {target}");
    }
    if let Some(kind) = config.target_kind() {
        println!("   • kind: {kind}");
    }
    for flag in config.flags() {
        println!("   • flag: {flag}");
    }
}

fn print_target(target: &TargetInfo, kinds: &KindRegistry) {
    let mut details = vec![format!("{:?}", kinds.guess_rule_type(&target.kind))];
    if let Some(size) = target.test_size {
        details.push(format!("{size:?}"));
    }
    if let Some(sync_time) = target.sync_time {
        details.push(format!("synced {sync_time}"));
    }
    println!("{} [{}] {}", target.label, target.kind, details.join(", "));
}

pub fn print_targets(index: &TargetIndex, kinds: &KindRegistry) {
    for target in &index.targets {
        print_target(target, kinds);
        for source in &target.sources {
            println!("   • {source}");
        }
        for wrapper in index.wrappers_of(&target.label) {
            println!("   ↳ wrapped by {}", wrapper.label);
        }
    }
}
