use std::io::{BufRead, Write};

use runtarget_core::types::{SourceElement, TargetInfo};
use runtarget_core::TargetChooser;

/// Answers with a preset 1-based position, as given on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedChooser {
    position: usize,
}

impl FixedChooser {
    pub fn new(position: usize) -> Self {
        Self { position }
    }
}

impl TargetChooser for FixedChooser {
    fn choose(&self, _element: &SourceElement, candidates: &[TargetInfo]) -> Option<usize> {
        let index = self.position.checked_sub(1)?;
        (index < candidates.len()).then_some(index)
    }
}

/// Lists the candidates on stderr and reads a number from stdin.
///
/// An empty answer, end of input or anything out of range dismisses the choice.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptChooser;

impl TargetChooser for PromptChooser {
    fn choose(&self, element: &SourceElement, candidates: &[TargetInfo]) -> Option<usize> {
        eprintln!("Several targets run {}:", element.display_name());
        for (i, target) in candidates.iter().enumerate() {
            eprintln!("  {}) {} ({})", i + 1, target.label, target.kind);
        }
        eprint!("Choose a target [1-{}]: ", candidates.len());
        std::io::stderr().flush().ok();

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer).ok()?;
        let position: usize = answer.trim().parse().ok()?;
        FixedChooser::new(position).choose(element, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtarget_core::types::Label;

    #[test]
    fn test_fixed_chooser_bounds() {
        let element = SourceElement::File {
            path: "pkg/FooTest.java".into(),
        };
        let candidates = vec![
            TargetInfo::new(Label::new("pkg", "a"), "web_test"),
            TargetInfo::new(Label::new("pkg", "b"), "web_test"),
        ];
        assert_eq!(FixedChooser::new(2).choose(&element, &candidates), Some(1));
        assert_eq!(FixedChooser::new(0).choose(&element, &candidates), None);
        assert_eq!(FixedChooser::new(3).choose(&element, &candidates), None);
    }
}
