//! Resolves verbs against a configuration and launches them.

use std::fs::OpenOptions;

use camino::Utf8Path;
use freud_config::{Config, ProcessProbe, SystemProbe};
use tracing::{debug, info};

use crate::PROCESS_TARGET;
use crate::errors::LaunchError;
use crate::invocation::{ErrorSink, Invocation, SpawnOptions, append_args, wrap_sudo};
use crate::process::ProcessControl;

const HELP_VERB: &str = "help";
const START_VERB: &str = "start";

/// Outcome of [`Launcher::run`] for calls that return to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launched {
    /// The verbs the configuration defines.
    Help {
        /// Verb names in sorted order.
        verbs: Vec<String>,
    },
    /// `start` found the service already running and did nothing.
    AlreadyRunning {
        /// Pid recorded in the pidfile.
        pid: u32,
    },
    /// `start` detached the service into the background.
    Spawned {
        /// Pid of the spawned child.
        pid: u32,
    },
    /// The process image was handed to the command. Only observable with a
    /// [`ProcessControl`] that returns from `exec`.
    Replaced,
}

/// Launches verbs defined by a resolved configuration.
#[derive(Debug)]
pub struct Launcher<'a, P, Q = SystemProbe> {
    config: &'a Config,
    process: P,
    probe: Q,
}

impl<'a, P> Launcher<'a, P, SystemProbe>
where
    P: ProcessControl,
{
    /// Builds a launcher that probes liveness with `kill(2)`.
    #[must_use]
    pub const fn new(config: &'a Config, process: P) -> Self {
        Self::with_probe(config, process, SystemProbe)
    }
}

impl<'a, P, Q> Launcher<'a, P, Q>
where
    P: ProcessControl,
    Q: ProcessProbe,
{
    /// Builds a launcher with an explicit liveness probe.
    #[must_use]
    pub const fn with_probe(config: &'a Config, process: P, probe: Q) -> Self {
        Self {
            config,
            process,
            probe,
        }
    }

    /// Runs `verb`, appending `args` to its command.
    ///
    /// `help` lists the configured verbs, `start` daemonises the service and
    /// any other configured verb replaces the launcher with its command.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::UnknownCommand`] for verbs the configuration
    /// does not define, and the other [`LaunchError`] variants when the
    /// pidfile, logfile or process primitives fail.
    pub fn run(&self, verb: &str, args: &[String]) -> Result<Launched, LaunchError> {
        match verb {
            HELP_VERB => Ok(Launched::Help {
                verbs: self.config.verbs().map(str::to_owned).collect(),
            }),
            START_VERB => self.daemonize(self.resolve(verb, args)?),
            _ => self.execute(self.invocation(self.resolve(verb, args)?)),
        }
    }

    fn resolve(&self, verb: &str, args: &[String]) -> Result<String, LaunchError> {
        let template = self
            .config
            .command(verb)
            .ok_or_else(|| LaunchError::UnknownCommand {
                verb: verb.to_owned(),
                known: self.config.verbs().map(str::to_owned).collect(),
            })?;
        let command = append_args(template, args);
        let Some(user) = self.config.sudo_user() else {
            return Ok(command);
        };
        Ok(wrap_sudo(&command, user))
    }

    fn invocation(&self, command: String) -> Invocation {
        Invocation {
            command,
            env: self.config.env().clone(),
            options: SpawnOptions::for_config(self.config),
        }
    }

    fn daemonize(&self, command: String) -> Result<Launched, LaunchError> {
        let pidfile = self.config.pidfile();
        if let Some(pid) = pidfile.running_pid_with(&self.probe)? {
            info!(
                target: PROCESS_TARGET,
                pid,
                name = self.config.name(),
                "service already running"
            );
            return Ok(Launched::AlreadyRunning { pid });
        }

        let mut invocation = self.invocation(command);
        if let Some(logfile) = self.config.logfile() {
            create_logfile(logfile)?;
            invocation.options.stderr = ErrorSink::Append(logfile.to_path_buf());
        }

        if self.config.background() {
            invocation.options.process_group = true;
            log_runtime_environment(&invocation);
            let pid = self
                .process
                .spawn(&invocation)
                .map_err(|source| LaunchError::Spawn {
                    command: invocation.command.clone(),
                    source,
                })?;
            self.maybe_create_pidfile(pid)?;
            return Ok(Launched::Spawned { pid });
        }

        self.maybe_create_pidfile(self.process.pid())?;
        self.execute(invocation)
    }

    fn execute(&self, invocation: Invocation) -> Result<Launched, LaunchError> {
        log_runtime_environment(&invocation);
        self.process
            .exec(&invocation)
            .map_err(|source| LaunchError::Exec {
                command: invocation.command,
                source,
            })?;
        Ok(Launched::Replaced)
    }

    fn maybe_create_pidfile(&self, pid: u32) -> Result<(), LaunchError> {
        if self.config.create_pidfile() {
            self.config.pidfile().write(pid)?;
        }
        Ok(())
    }
}

fn create_logfile(path: &Utf8Path) -> Result<(), LaunchError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|source| LaunchError::Logfile {
            path: path.to_path_buf(),
            source,
        })
}

fn log_runtime_environment(invocation: &Invocation) {
    debug!(
        target: PROCESS_TARGET,
        command = %invocation.command,
        env = ?invocation.env,
        options = ?invocation.options,
        "launching command"
    );
}
