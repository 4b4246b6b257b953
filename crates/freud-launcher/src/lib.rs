//! Launches the commands a freud descriptor defines.
//!
//! [`Launcher::run`] resolves a verb against a [`freud_config::Config`],
//! wraps it for `sudo` when a user is configured and hands the resulting
//! [`Invocation`] to a [`ProcessControl`]. `start` consults the pidfile first
//! and either spawns a detached child or replaces the launcher in place; every
//! other verb replaces the launcher.

mod errors;
mod invocation;
mod launcher;
mod process;


pub use errors::LaunchError;
pub use invocation::{ErrorSink, Invocation, SpawnOptions, append_args, wrap_sudo};
pub use launcher::{Launched, Launcher};
pub use process::{ProcessControl, SystemProcess};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
