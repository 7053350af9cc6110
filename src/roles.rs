use crate::core::error::AishError;
use crate::system::SystemInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// What shape of output a role promises, so downstream formatting and
/// execution know how to treat the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    Text,
    Shell,
    Code,
}

/// A named behavioral preset: system-prompt template plus output contract.
/// Immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub template: String,
    pub output: OutputKind,
}

pub const DEFAULT_ROLE: &str = "default";
pub const SHELL_ROLE: &str = "shell";
pub const DESCRIBE_SHELL_ROLE: &str = "describe-shell";
pub const CODE_ROLE: &str = "code";

const DEFAULT_TEMPLATE: &str = "You are a helpful command-line assistant running on {os} with the \
{shell} shell. Answer the user's questions in a concise manner.";

const SHELL_TEMPLATE: &str = "Convert the natural language query to a single command that will \
work on the current system. Only output the bare command without any explanation or markdown \
formatting. Include any necessary flags to make the command compatible with the current shell \
and OS. The current shell is {shell} and the OS is {os}.";

const DESCRIBE_SHELL_TEMPLATE: &str = "Explain the given shell command in a concise and \
easy-to-understand way. Describe what the command does, what its main flags/options mean, and \
provide a simple example if applicable. Assume the {shell} shell on {os}.";

const CODE_TEMPLATE: &str = "Provide only code as output, without any description or markdown \
fences. If there is a lack of details, provide the most logical solution. You are not allowed \
to ask for more details.";

/// Static lookup of roles, loaded once at startup.
pub struct RoleRegistry {
    roles: HashMap<String, Role>,
}

impl RoleRegistry {
    /// Registry holding only the built-in roles.
    pub fn builtin() -> Self {
        let mut registry = Self {
            roles: HashMap::new(),
        };
        registry.register(Role {
            name: DEFAULT_ROLE.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            output: OutputKind::Text,
        });
        registry.register(Role {
            name: SHELL_ROLE.to_string(),
            template: SHELL_TEMPLATE.to_string(),
            output: OutputKind::Shell,
        });
        registry.register(Role {
            name: DESCRIBE_SHELL_ROLE.to_string(),
            template: DESCRIBE_SHELL_TEMPLATE.to_string(),
            output: OutputKind::Text,
        });
        registry.register(Role {
            name: CODE_ROLE.to_string(),
            template: CODE_TEMPLATE.to_string(),
            output: OutputKind::Code,
        });
        registry
    }

    fn register(&mut self, role: Role) {
        if self.roles.contains_key(&role.name) {
            warn!(role = %role.name, "overriding previously registered role");
        }
        self.roles.insert(role.name.clone(), role);
    }

    /// Add user-defined roles from `<dir>/*.json`. Missing dir is fine.
    pub fn load_custom(&mut self, dir: &Path) -> Result<(), AishError> {
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let role: Role = serde_json::from_str(&contents).map_err(|e| {
                AishError::Config(format!("Invalid role file {}: {}", path.display(), e))
            })?;
            self.register(role);
        }

        Ok(())
    }

    pub fn resolve(&self, role_id: &str) -> Result<&Role, AishError> {
        self.roles
            .get(role_id)
            .ok_or_else(|| AishError::UnknownRole(role_id.to_string()))
    }

    /// Substitute the closed placeholder set into the role template and
    /// return the finished system prompt.
    pub fn render(&self, role: &Role, system: &SystemInfo) -> String {
        role.template
            .replace("{os}", &system.os)
            .replace("{shell}", &system.shell_name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roles.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::ShellKind;

    fn system() -> SystemInfo {
        SystemInfo {
            os: "Linux 6.1".to_string(),
            shell_path: "/bin/bash".to_string(),
            shell_name: "bash".to_string(),
            shell_kind: ShellKind::UnixLike,
        }
    }

    #[test]
    fn resolves_builtin_roles() {
        let registry = RoleRegistry::builtin();
        assert_eq!(registry.resolve(SHELL_ROLE).unwrap().output, OutputKind::Shell);
        assert_eq!(registry.resolve(CODE_ROLE).unwrap().output, OutputKind::Code);
    }

    #[test]
    fn unknown_role_is_an_error() {
        let registry = RoleRegistry::builtin();
        assert!(matches!(
            registry.resolve("nope"),
            Err(AishError::UnknownRole(name)) if name == "nope"
        ));
    }

    #[test]
    fn render_substitutes_placeholders() {
        let registry = RoleRegistry::builtin();
        let role = registry.resolve(SHELL_ROLE).unwrap();
        let rendered = registry.render(role, &system());
        assert!(rendered.contains("bash"));
        assert!(rendered.contains("Linux 6.1"));
        assert!(!rendered.contains("{shell}"));
        assert!(!rendered.contains("{os}"));
    }

    #[test]
    fn loads_custom_roles_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let role = Role {
            name: "pirate".to_string(),
            template: "Answer like a pirate on {os}.".to_string(),
            output: OutputKind::Text,
        };
        std::fs::write(
            dir.path().join("pirate.json"),
            serde_json::to_string(&role).unwrap(),
        )
        .unwrap();

        let mut registry = RoleRegistry::builtin();
        registry.load_custom(dir.path()).unwrap();
        assert_eq!(registry.resolve("pirate").unwrap().template, role.template);
    }
}
