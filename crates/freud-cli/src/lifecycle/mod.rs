//! Controller verbs for a running service.
//!
//! This module is split into focused submodules so each concern remains small
//! and testable:
//! - [`types`] defines the verb models and IO helpers.
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`polling`] bounds the wait verbs with a deadline.
//! - [`controller`] implements the check, wait and signal flows.

mod controller;
mod error;
mod polling;
mod types;

pub use controller::Controller;
pub use error::LifecycleError;
pub use types::{
    CONTROLLER_PREFIX, LifecycleCommand, LifecycleContext, LifecycleInvocation, LifecycleOutput,
    ServiceState,
};

/// Default upper bound for the wait verbs, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");
