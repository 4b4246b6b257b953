//! The resolved, read-only configuration produced by assembly.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::pidfile::Pidfile;
use crate::variables::VariableStore;

/// Fully merged and interpolated service configuration.
///
/// Instances are only produced by [`crate::assemble`]; there are no setters.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub(crate) name: String,
    pub(crate) stage: String,
    pub(crate) descriptor: Utf8PathBuf,
    pub(crate) root: Utf8PathBuf,
    pub(crate) background: bool,
    pub(crate) create_pidfile: bool,
    pub(crate) reset_env: bool,
    pub(crate) pidfile: Pidfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) logfile: Option<Utf8PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) sudo_user: Option<String>,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) commands: BTreeMap<String, String>,
    #[serde(skip)]
    pub(crate) variables: VariableStore,
}

impl Config {
    /// Service name, used for `%name`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage the configuration was assembled for.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Absolute path of the descriptor file.
    #[must_use]
    pub fn descriptor(&self) -> &Utf8Path {
        &self.descriptor
    }

    /// Working directory for launched commands.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Whether `start` detaches the service instead of replacing the launcher.
    #[must_use]
    pub const fn background(&self) -> bool {
        self.background
    }

    /// Whether `start` records a pid.
    #[must_use]
    pub const fn create_pidfile(&self) -> bool {
        self.create_pidfile
    }

    /// Whether launched commands see only the configured environment.
    #[must_use]
    pub const fn reset_env(&self) -> bool {
        self.reset_env
    }

    /// Handle to the service pidfile.
    #[must_use]
    pub const fn pidfile(&self) -> &Pidfile {
        &self.pidfile
    }

    /// Absolute logfile path, when one is configured.
    #[must_use]
    pub fn logfile(&self) -> Option<&Utf8Path> {
        self.logfile.as_deref()
    }

    /// User commands run as, when privileges should change.
    #[must_use]
    pub fn sudo_user(&self) -> Option<&str> {
        self.sudo_user.as_deref()
    }

    /// Interpolated environment passed to launched commands.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Interpolated verb templates keyed by verb.
    #[must_use]
    pub const fn commands(&self) -> &BTreeMap<String, String> {
        &self.commands
    }

    /// Shell command bound to `verb`.
    #[must_use]
    pub fn command(&self, verb: &str) -> Option<&str> {
        self.commands.get(verb).map(String::as_str)
    }

    /// Verb names in sorted order.
    pub fn verbs(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Variable bindings after assembly, including `root`, `pidfile` and `pid`.
    #[must_use]
    pub const fn variables(&self) -> &VariableStore {
        &self.variables
    }
}
