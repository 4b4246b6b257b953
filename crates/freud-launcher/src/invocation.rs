//! Describes a single OS-level launch: the shell command, its environment and
//! the descriptor plumbing applied before it runs.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use freud_config::Config;

/// Destination for the service's merged output streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSink {
    /// Write to the launcher's own standard error.
    Inherit,
    /// Append to the given file.
    Append(Utf8PathBuf),
}

/// Process-level options applied when launching a command.
///
/// Standard input is always bound to the null device and standard output
/// always follows standard error. Descriptors beyond the standard three are
/// never inherited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Working directory of the child.
    pub chdir: Utf8PathBuf,
    /// Start from an empty environment instead of the launcher's.
    pub reset_env: bool,
    /// Where standard error, and therefore standard output, is written.
    pub stderr: ErrorSink,
    /// Place the child in a new process group.
    pub process_group: bool,
}

impl SpawnOptions {
    /// Options shared by every launch of `config`.
    #[must_use]
    pub fn for_config(config: &Config) -> Self {
        Self {
            chdir: config.root().to_path_buf(),
            reset_env: config.reset_env(),
            stderr: ErrorSink::Inherit,
            process_group: false,
        }
    }
}

/// A fully resolved command ready to hand to a [`crate::ProcessControl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command line passed to `/bin/sh -c`.
    pub command: String,
    /// Variables set for the child on top of, or instead of, the inherited
    /// environment.
    pub env: BTreeMap<String, String>,
    /// Process-level options.
    pub options: SpawnOptions,
}

/// Appends shell-quoted `args` to `template`.
#[must_use]
pub fn append_args(template: &str, args: &[String]) -> String {
    if args.is_empty() {
        return template.to_owned();
    }
    format!("{template} {}", shell_words::join(args))
}

/// Wraps `command` so it runs as `user` through a non-interactive sudo.
///
/// The environment is carried across with `--preserve-env`; the command is
/// embedded in a double-quoted `bash -c` argument.
#[must_use]
pub fn wrap_sudo(command: &str, user: &str) -> String {
    format!(
        "sudo -n --preserve-env -u {} -- bash -c \"{}\"",
        shell_words::quote(user),
        escape_double_quoted(command)
    )
}

fn escape_double_quoted(command: &str) -> String {
    let mut escaped = String::with_capacity(command.len());
    for character in command.chars() {
        if matches!(character, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::no_args(&[], "/bin/echo")]
    #[case::plain(&["a", "b"], "/bin/echo a b")]
    #[case::spaced(&["a b"], "/bin/echo 'a b'")]
    #[case::quote(&["it's"], "/bin/echo 'it'\\''s'")]
    fn append_args_quotes_each_argument(#[case] args: &[&str], #[case] expected: &str) {
        let owned: Vec<String> = args.iter().map(|arg| (*arg).to_owned()).collect();
        assert_eq!(append_args("/bin/echo", &owned), expected);
    }

    #[rstest]
    #[case::plain("/bin/true", "sudo -n --preserve-env -u deploy -- bash -c \"/bin/true\"")]
    #[case::quotes(
        "echo \"hi\"",
        "sudo -n --preserve-env -u deploy -- bash -c \"echo \\\"hi\\\"\""
    )]
    #[case::expansion(
        "echo $HOME `id`",
        "sudo -n --preserve-env -u deploy -- bash -c \"echo \\$HOME \\`id\\`\""
    )]
    #[case::backslash("a\\b", "sudo -n --preserve-env -u deploy -- bash -c \"a\\\\b\"")]
    fn wrap_sudo_escapes_for_double_quotes(#[case] command: &str, #[case] expected: &str) {
        assert_eq!(wrap_sudo(command, "deploy"), expected);
    }

    #[test]
    fn wrap_sudo_quotes_unusual_user_names() {
        let wrapped = wrap_sudo("/bin/true", "web user");
        assert!(wrapped.starts_with("sudo -n --preserve-env -u 'web user' -- "));
    }
}
