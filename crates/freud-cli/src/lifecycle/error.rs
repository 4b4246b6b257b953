//! Error types for controller verbs.

use std::io;

use freud_config::PidfileError;
use thiserror::Error;

use super::types::{LifecycleCommand, ServiceState};

/// Errors raised while executing controller verbs.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The `@` verb is not a controller verb.
    #[error("unknown command: {verb} (valid commands: {})", LifecycleCommand::names().join(", "))]
    UnknownCommand {
        /// Verb as given on the command line.
        verb: String,
    },
    /// A signal verb found no running process.
    #[error("{name} is not running")]
    NotRunning {
        /// Service name.
        name: String,
    },
    /// A wait verb gave up before observing the expected state.
    #[error("{name} not {expected} within {timeout_secs} seconds")]
    WaitTimeout {
        /// Service name.
        name: String,
        /// State the verb was waiting for.
        expected: ServiceState,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },
    /// Probing or signalling through the pidfile failed.
    #[error(transparent)]
    Pidfile(#[from] PidfileError),
    /// Writing a report failed.
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}
