//! Reload-target resolution.
//!
//! `fswatch run`'s `command` argument names either a literal shell command
//! or a `"namespace::action"` string resolved against a static registry: a
//! fixed [`std::process::Command`] template (`cargo::build`, `cargo::test`,
//! ...) known to the binary at compile time. Anything that isn't a
//! registered name is treated as a literal shell command.

use std::process::Command;

/// One thing `fswatch run` can re-launch on every reload.
#[derive(Clone, Debug)]
pub enum ReloadTarget {
    /// A literal command and its arguments, run as-is.
    Shell(Vec<String>),
    /// A name resolved against the built-in registry below.
    Registry(String),
}

impl ReloadTarget {
    /// Parse a CLI-supplied target string.
    ///
    /// A bare `"namespace::action"` token (no spaces, containing `::`) is
    /// tried against the registry first; anything else — including a
    /// multi-word command coming from the `-- <command>...` tail — is a
    /// literal shell invocation.
    pub fn parse(words: &[String]) -> Self {
        if let [single] = words {
            if single.contains("::") && !single.contains(char::is_whitespace) && registry_lookup(single).is_some() {
                return ReloadTarget::Registry(single.clone());
            }
        }
        ReloadTarget::Shell(words.to_vec())
    }

    /// Build the [`Command`] to spawn for this target.
    pub fn resolve(&self) -> anyhow::Result<Command> {
        match self {
            ReloadTarget::Shell(words) => {
                let [program, args @ ..] = words.as_slice() else {
                    anyhow::bail!("no command given to run");
                };
                let mut cmd = Command::new(program);
                cmd.args(args);
                Ok(cmd)
            }
            ReloadTarget::Registry(name) => {
                registry_lookup(name).ok_or_else(|| anyhow::anyhow!("unknown reload target \"{name}\""))
            }
        }
    }
}

/// The built-in `"namespace::action"` registry, scoped to the handful of
/// reload actions a Rust project actually needs (there is no generic
/// "import and call a function" equivalent without a plugin ABI, which is
/// out of scope here).
fn registry_lookup(name: &str) -> Option<Command> {
    let (program, args): (&str, &[&str]) = match name {
        "cargo::build" => ("cargo", &["build"]),
        "cargo::check" => ("cargo", &["check"]),
        "cargo::test" => ("cargo", &["test"]),
        "cargo::run" => ("cargo", &["run"]),
        "make::all" => ("make", &[]),
        _ => return None,
    };
    let mut cmd = Command::new(program);
    cmd.args(args);
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_name_resolves_to_known_command() {
        let target = ReloadTarget::parse(&["cargo::test".to_string()]);
        assert!(matches!(target, ReloadTarget::Registry(_)));
        let cmd = target.resolve().unwrap();
        assert_eq!(cmd.get_program(), "cargo");
    }

    #[test]
    fn unknown_double_colon_name_falls_back_to_shell() {
        let target = ReloadTarget::parse(&["not::registered".to_string()]);
        assert!(matches!(target, ReloadTarget::Shell(_)));
    }

    #[test]
    fn multi_word_command_is_always_shell() {
        let words = vec!["python3".to_string(), "app.py".to_string()];
        let target = ReloadTarget::parse(&words);
        assert!(matches!(target, ReloadTarget::Shell(_)));
        let cmd = target.resolve().unwrap();
        assert_eq!(cmd.get_program(), "python3");
    }

    #[test]
    fn empty_shell_target_errors() {
        let target = ReloadTarget::Shell(vec![]);
        assert!(target.resolve().is_err());
    }
}
