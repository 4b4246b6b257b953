//! Defines the error surface for launching service commands.

use std::io;

use camino::Utf8PathBuf;
use freud_config::PidfileError;
use thiserror::Error;

/// Errors surfaced while resolving or launching a verb.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The verb is not defined by the configuration.
    #[error("unknown command: {verb} (valid commands: {})", known.join(", "))]
    UnknownCommand {
        /// Requested verb.
        verb: String,
        /// Verbs the configuration defines.
        known: Vec<String>,
    },
    /// The configured logfile could not be opened for appending.
    #[error("unable to open logfile '{path}': {source}")]
    Logfile {
        /// Logfile path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing or writing the pidfile failed.
    #[error(transparent)]
    Pidfile(#[from] PidfileError),
    /// Replacing the launcher with the service command failed.
    #[error("failed to execute '{command}': {source}")]
    Exec {
        /// Shell command that could not be executed.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Spawning the background service failed.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// Shell command that could not be spawned.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
