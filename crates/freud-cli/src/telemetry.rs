//! Structured telemetry initialisation for the launcher.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;

use crate::cli::LogFormat;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Environment variable holding the default log filter.
pub const LOG_FILTER_ENV_VAR: &str = "FREUD_LOG";

/// Environment variable that raises the default filter to `debug`.
pub const DEBUG_ENV_VAR: &str = "DEBUG";

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Logging settings resolved from flags and the environment snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Tracing filter directive.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl TelemetrySettings {
    /// Resolves the filter: the explicit flag wins, then `FREUD_LOG`, then
    /// `debug` when `DEBUG` is set and `info` otherwise.
    #[must_use]
    pub fn resolve(
        flag: Option<&str>,
        format: LogFormat,
        environment: &BTreeMap<String, String>,
    ) -> Self {
        let filter = flag
            .map(str::to_owned)
            .or_else(|| environment.get(LOG_FILTER_ENV_VAR).cloned())
            .unwrap_or_else(|| {
                let level = if environment.contains_key(DEBUG_ENV_VAR) {
                    "debug"
                } else {
                    "info"
                };
                level.to_owned()
            });
        Self { filter, format }
    }

    /// Parses the filter directive.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Filter`] when a directive does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(&self.filter).map_err(|error| TelemetryError::Filter(error.to_string()))
    }

    // Diagnostics go to stderr; stdout carries status lines and dumps.
    fn install(&self) -> Result<(), TelemetryError> {
        let filter = self.env_filter()?;
        let output = fmt::Subscriber::builder()
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_target(true)
            .with_timer(UtcTime::rfc_3339());
        let subscriber: Box<dyn Subscriber + Send + Sync> = match self.format {
            LogFormat::Json => Box::new(
                output
                    .json()
                    .flatten_event(true)
                    .with_env_filter(filter)
                    .finish(),
            ),
            LogFormat::Compact => Box::new(output.compact().with_env_filter(filter).finish()),
        };
        tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
    }
}

/// Installs the global stderr subscriber the first time it is called.
///
/// Later calls leave the installed subscriber in place and succeed.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another subscriber
/// is already installed.
pub fn initialise(settings: &TelemetrySettings) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| settings.install())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn environment(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[rstest]
    #[case::default(None, &[], "info")]
    #[case::debug_switch(None, &[("DEBUG", "1")], "debug")]
    #[case::environment(None, &[("FREUD_LOG", "warn"), ("DEBUG", "1")], "warn")]
    #[case::flag_wins(Some("trace"), &[("FREUD_LOG", "warn")], "trace")]
    fn resolves_filter_precedence(
        #[case] flag: Option<&str>,
        #[case] pairs: &[(&str, &str)],
        #[case] expected: &str,
    ) {
        let settings = TelemetrySettings::resolve(flag, LogFormat::Compact, &environment(pairs));
        assert_eq!(settings.filter, expected);
    }

    #[test]
    fn malformed_filter_is_rejected() {
        let settings = TelemetrySettings::resolve(
            Some("freud=loud"),
            LogFormat::Compact,
            &BTreeMap::new(),
        );
        assert!(matches!(settings.env_filter(), Err(TelemetryError::Filter(_))));
    }

    #[test]
    fn initialise_is_idempotent() {
        let settings = TelemetrySettings::resolve(None, LogFormat::Compact, &BTreeMap::new());
        assert!(initialise(&settings).is_ok());
        assert!(initialise(&settings).is_ok());
    }
}
