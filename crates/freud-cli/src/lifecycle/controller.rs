//! Dispatches controller verbs against the service pidfile.
//!
//! Every verb derives the service state afresh from the pidfile; nothing is
//! cached between probes.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use freud_config::{Config, ProcessProbe, Signal, SystemProbe};
use tracing::info;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::polling::{POLL_INTERVAL, poll_until};
use super::types::{
    LifecycleCommand, LifecycleContext, LifecycleInvocation, LifecycleOutput, ServiceState,
};

/// Controller verb dispatcher.
#[derive(Debug)]
pub struct Controller<P = SystemProbe> {
    probe: P,
    poll_interval: Duration,
}

impl Controller<SystemProbe> {
    /// Builds a controller that probes with `kill(2)`.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_probe(SystemProbe, POLL_INTERVAL)
    }
}

impl Default for Controller<SystemProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProcessProbe> Controller<P> {
    /// Builds a controller with an explicit probe and poll interval.
    #[must_use]
    pub const fn with_probe(probe: P, poll_interval: Duration) -> Self {
        Self {
            probe,
            poll_interval,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_probe(self) -> P {
        self.probe
    }

    /// Runs a controller verb.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::WaitTimeout`] when a wait verb gives up,
    /// [`LifecycleError::NotRunning`] when a signal verb finds no process and
    /// [`LifecycleError::Pidfile`] when probing or signalling fails.
    pub fn handle<W: Write, E: Write>(
        &self,
        invocation: LifecycleInvocation,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let config = context.config;
        match invocation.command {
            LifecycleCommand::Check => self.check(config, invocation, output),
            LifecycleCommand::WaitUp => self.wait(config, ServiceState::Up, invocation, output),
            LifecycleCommand::WaitDown => {
                self.wait(config, ServiceState::Down, invocation, output)
            }
            LifecycleCommand::SignalTerm => self.signal(config, Signal::SIGTERM, invocation, output),
            LifecycleCommand::SignalKill => self.signal(config, Signal::SIGKILL, invocation, output),
            LifecycleCommand::SignalHup => self.signal(config, Signal::SIGHUP, invocation, output),
        }
    }

    fn running_pid(&self, config: &Config) -> Result<Option<u32>, LifecycleError> {
        Ok(config.pidfile().running_pid_with(&self.probe)?)
    }

    fn check<W: Write, E: Write>(
        &self,
        config: &Config,
        invocation: LifecycleInvocation,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let pid = self.running_pid(config)?;
        if !invocation.quiet {
            report_state(output, config.name(), pid)?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn wait<W: Write, E: Write>(
        &self,
        config: &Config,
        expected: ServiceState,
        invocation: LifecycleInvocation,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        if !invocation.quiet {
            output.stderr_line(format_args!(
                "Waiting up to {} seconds for {} to be {expected}.",
                invocation.timeout.as_secs(),
                config.name()
            ))?;
        }
        let mut last_pid = None;
        let reached = poll_until(invocation.timeout, self.poll_interval, || {
            last_pid = self.running_pid(config)?;
            Ok(ServiceState::from_pid(last_pid) == expected)
        })?;
        if !reached {
            return Err(LifecycleError::WaitTimeout {
                name: config.name().to_owned(),
                expected,
                timeout_secs: invocation.timeout.as_secs(),
            });
        }
        if !invocation.quiet {
            report_state(output, config.name(), last_pid)?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn signal<W: Write, E: Write>(
        &self,
        config: &Config,
        signal: Signal,
        invocation: LifecycleInvocation,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        if self.running_pid(config)?.is_none() {
            return Err(LifecycleError::NotRunning {
                name: config.name().to_owned(),
            });
        }
        let Some(pid) = config.pidfile().kill_with(&self.probe, signal)? else {
            return Err(LifecycleError::NotRunning {
                name: config.name().to_owned(),
            });
        };
        info!(
            target: LIFECYCLE_TARGET,
            pid,
            %signal,
            name = config.name(),
            "signalled service"
        );
        if !invocation.quiet {
            output.stdout_line(format_args!("Sent {signal} to {} (PID {pid}).", config.name()))?;
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn report_state<W: Write, E: Write>(
    output: &mut LifecycleOutput<W, E>,
    name: &str,
    running: Option<u32>,
) -> Result<(), LifecycleError> {
    let Some(pid) = running else {
        return output.stdout_line(format_args!("{name} down."));
    };
    output.stdout_line(format_args!("{name} up with PID {pid}."))
}
