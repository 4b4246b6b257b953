//! Controller verb models and output abstractions.
//!
//! Defines the payloads and IO wrappers shared across controller verbs so the
//! controller can remain agnostic of concrete writers.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use freud_config::Config;

use super::LifecycleError;

/// Prefix distinguishing controller verbs from descriptor commands.
pub const CONTROLLER_PREFIX: char = '@';

/// Supported controller verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Reports whether the service is up.
    Check,
    /// Polls until the service is up.
    WaitUp,
    /// Polls until the service is down.
    WaitDown,
    /// Delivers `SIGTERM`.
    SignalTerm,
    /// Delivers `SIGKILL`.
    SignalKill,
    /// Delivers `SIGHUP`.
    SignalHup,
}

impl LifecycleCommand {
    const ALL: [Self; 6] = [
        Self::Check,
        Self::WaitUp,
        Self::WaitDown,
        Self::SignalTerm,
        Self::SignalKill,
        Self::SignalHup,
    ];

    /// Verb names as typed on the command line.
    #[must_use]
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(ToString::to_string).collect()
    }

    /// Whether `verb` is addressed to the controller.
    #[must_use]
    pub fn is_controller_verb(verb: &str) -> bool {
        verb.starts_with(CONTROLLER_PREFIX)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::WaitUp => "wait-up",
            Self::WaitDown => "wait-down",
            Self::SignalTerm => "signal-term",
            Self::SignalKill => "signal-kill",
            Self::SignalHup => "signal-hup",
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{CONTROLLER_PREFIX}{}", self.name())
    }
}

impl FromStr for LifecycleCommand {
    type Err = LifecycleError;

    fn from_str(verb: &str) -> Result<Self, Self::Err> {
        let name = verb.strip_prefix(CONTROLLER_PREFIX);
        Self::ALL
            .into_iter()
            .find(|command| Some(command.name()) == name)
            .ok_or_else(|| LifecycleError::UnknownCommand {
                verb: verb.to_owned(),
            })
    }
}

/// Observed liveness of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// The recorded pid belongs to a live process.
    Up,
    /// No live process is recorded.
    Down,
}

impl ServiceState {
    pub(crate) const fn from_pid(pid: Option<u32>) -> Self {
        if pid.is_some() { Self::Up } else { Self::Down }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => formatter.write_str("up"),
            Self::Down => formatter.write_str("down"),
        }
    }
}

/// Invocation payload forwarded from the CLI runtime.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleInvocation {
    /// Verb to run.
    pub command: LifecycleCommand,
    /// Upper bound for the wait verbs.
    pub timeout: Duration,
    /// Suppress status reports on stdout.
    pub quiet: bool,
}

/// Configuration available to controller verbs.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    /// Resolved service configuration.
    pub config: &'a Config,
}

/// Output handle abstracting over stdout/stderr writers.
pub struct LifecycleOutput<W: Write, E: Write> {
    /// Report stream.
    pub stdout: W,
    /// Diagnostic stream.
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    /// Wraps the given writers.
    #[must_use]
    pub const fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes one line to stdout and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Io`] when the write fails.
    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stdout.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stdout.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stdout.flush().map_err(LifecycleError::Io)
    }

    /// Writes one line to stderr and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Io`] when the write fails.
    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stderr.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stderr.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stderr.flush().map_err(LifecycleError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::check("@check", LifecycleCommand::Check)]
    #[case::wait_up("@wait-up", LifecycleCommand::WaitUp)]
    #[case::wait_down("@wait-down", LifecycleCommand::WaitDown)]
    #[case::term("@signal-term", LifecycleCommand::SignalTerm)]
    #[case::kill("@signal-kill", LifecycleCommand::SignalKill)]
    #[case::hup("@signal-hup", LifecycleCommand::SignalHup)]
    fn parses_controller_verbs(#[case] verb: &str, #[case] expected: LifecycleCommand) {
        let parsed: LifecycleCommand = verb.parse().expect("parse verb");
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), verb);
    }

    #[rstest]
    #[case::unknown("@bogus")]
    #[case::missing_prefix("check")]
    fn rejects_unknown_verbs(#[case] verb: &str) {
        let result = verb.parse::<LifecycleCommand>();
        let Err(error) = result else {
            panic!("expected an error for {verb}");
        };
        assert_eq!(
            error.to_string(),
            format!(
                "unknown command: {verb} (valid commands: @check, @wait-up, @wait-down, \
                 @signal-term, @signal-kill, @signal-hup)"
            )
        );
    }
}
