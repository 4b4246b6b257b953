//! Descriptor loading and configuration assembly for the freud launcher.
//!
//! A service is described by a JSON descriptor. [`load`] reads one from disk
//! and runs it through the assembly pipeline: defaults, descriptor globals,
//! the selected stage and computed overrides are deep-merged, validated and
//! then interpolated with a [`VariableStore`]. The result is a read-only
//! [`Config`] carrying a [`Pidfile`] handle for liveness checks.

mod assemble;
mod config;
pub mod defaults;
mod descriptor;
mod errors;
mod merge;
mod paths;
mod pidfile;
mod validate;
mod variables;

pub use assemble::{AssemblyContext, assemble, load};
pub use config::Config;
pub use descriptor::{load_descriptor, parse_descriptor, strip_comments};
pub use errors::ConfigError;
pub use merge::{deep_merge, snakify, snakify_keys};
pub use nix::errno::Errno;
pub use paths::{expand_path, normalise};
pub use pidfile::{Pidfile, PidfileError, ProbeOutcome, ProcessProbe, Signal, SystemProbe};
pub use validate::validate;
pub use variables::{VariableError, VariableStore, unescape};
