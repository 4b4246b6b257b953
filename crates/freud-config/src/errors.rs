//! Error surface for descriptor loading and configuration assembly.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::variables::VariableError;

/// Errors raised while loading a descriptor or assembling its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The descriptor file could not be read.
    #[error("can't open descriptor '{path}': {source}")]
    ReadDescriptor {
        /// Descriptor path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The descriptor is not valid JSON once comments are removed.
    #[error("failed to parse descriptor '{path}': {source}")]
    ParseDescriptor {
        /// Descriptor path.
        path: Utf8PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// A descriptor field holds a value of the wrong type.
    #[error("invalid descriptor: {key} must be {expected}")]
    Validation {
        /// Offending key, dotted for nested entries (`env.PORT`).
        key: String,
        /// Human-readable description of the accepted type.
        expected: &'static str,
    },
    /// The requested stage is not declared under `stages`.
    #[error("unknown stage: {stage} (known stages: {})", available.join(", "))]
    UnknownStage {
        /// Requested stage name.
        stage: String,
        /// Stage names declared by the descriptor and defaults.
        available: Vec<String>,
    },
    /// Expanding a templated field failed.
    #[error("failed to interpolate {key}: {source}")]
    Interpolation {
        /// Field being interpolated (`pidfile`, `commands.start`, ...).
        key: String,
        /// Underlying variable error.
        #[source]
        source: VariableError,
    },
}
