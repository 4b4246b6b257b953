//! Command-line argument definitions for the `freud` binary.

use clap::{Parser, ValueEnum};

use crate::lifecycle::DEFAULT_TIMEOUT_SECS;

/// Log output formats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Launches and controls a single service described by a JSON descriptor.
#[derive(Parser, Debug)]
#[command(name = "freud", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Seconds `@wait-up` and `@wait-down` poll before giving up.
    #[arg(short, long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub(crate) timeout: u64,
    /// Suppresses status reports from controller verbs.
    #[arg(short, long)]
    pub(crate) quiet: bool,
    /// Tracing filter directive; defaults to `FREUD_LOG`, then `info`.
    #[arg(long, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Format of diagnostic log lines written to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
    /// Verb to run: a descriptor command, `help`, `dump-config`, `generate`,
    /// or a controller verb such as `@check`.
    #[arg(value_name = "COMMAND")]
    pub(crate) command: String,
    /// Descriptor path or bare service name; defaults to `FREUD_CONFIG`.
    #[arg(value_name = "FILE")]
    pub(crate) file: Option<String>,
    /// Stage overlay; defaults to `FREUD_STAGE`, then `development`.
    #[arg(value_name = "STAGE")]
    pub(crate) stage: Option<String>,
    /// Arguments appended to the command, given after `--`.
    #[arg(value_name = "ARGS", last = true)]
    pub(crate) args: Vec<String>,
}
