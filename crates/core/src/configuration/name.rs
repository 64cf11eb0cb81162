use super::state::RunConfigurationState;
use crate::types::BuildCommand;

/// Builds configuration names of the form `{build system} {command} {target}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameBuilder {
    build_system: String,
    command: Option<BuildCommand>,
    target: Option<String>,
}

impl NameBuilder {
    pub fn new(build_system: impl Into<String>) -> Self {
        Self {
            build_system: build_system.into(),
            command: None,
            target: None,
        }
    }

    /// Seeds the builder from the configuration's command and targets.
    pub fn for_state(state: &RunConfigurationState) -> Self {
        let target = match state.target_patterns() {
            [] => None,
            [single] => Some(single.clone()),
            [first, rest @ ..] => Some(format!("{} and {} more", first, rest.len())),
        };
        Self {
            build_system: state.build_system().to_string(),
            command: state.command(),
            target,
        }
    }

    pub fn with_command(mut self, command: BuildCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_target_string(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn build(&self) -> String {
        let mut parts = vec![self.build_system.clone()];
        if let Some(command) = self.command {
            parts.push(command.to_string());
        }
        if let Some(target) = &self.target {
            parts.push(target.clone());
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_full_name() {
        let name = NameBuilder::new("Bazel")
            .with_command(BuildCommand::Test)
            .with_target_string("//pkg:FooTest")
            .build();
        assert_eq!(name, "Bazel test //pkg:FooTest");
    }

    #[test]
    fn test_build_without_target() {
        assert_eq!(NameBuilder::new("Bazel").build(), "Bazel");
        assert_eq!(
            NameBuilder::new("Blaze").with_command(BuildCommand::Run).build(),
            "Blaze run"
        );
    }
}
