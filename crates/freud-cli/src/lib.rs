//! Command-line runtime for the freud launcher.
//!
//! The runtime parses arguments, resolves the descriptor and stage from the
//! command line and an environment snapshot, assembles the configuration and
//! routes the verb. Controller verbs (`@check`, `@wait-up`, ...) go to the
//! [`lifecycle::Controller`]; everything else is handed to the
//! [`freud_launcher::Launcher`]. IO streams and the environment are injected
//! so the runtime can be driven from tests.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use freud_config::defaults::{DEFAULT_STAGE, STAGE_ENV_VAR};
use freud_config::{AssemblyContext, Config, load};
use freud_launcher::{Launched, Launcher, SystemProcess};
use tracing::info;

mod cli;
mod errors;
pub mod lifecycle;
mod resolve;
mod scaffold;
pub mod telemetry;
#[cfg(test)]
mod tests;

pub use cli::LogFormat;
use cli::Cli;
use errors::AppError;
use lifecycle::{
    Controller, LifecycleCommand, LifecycleContext, LifecycleInvocation, LifecycleOutput,
};
use resolve::resolve_descriptor;
use telemetry::TelemetrySettings;

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cli");
const DUMP_CONFIG_VERB: &str = "dump-config";
const GENERATE_VERBS: [&str; 2] = ["generate", "g"];

struct CliRunner<'a, W: Write, E: Write> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    environment: BTreeMap<String, String>,
    working_dir: Utf8PathBuf,
}

impl<'a, W: Write, E: Write> CliRunner<'a, W, E> {
    const fn new(
        stdout: &'a mut W,
        stderr: &'a mut E,
        environment: BTreeMap<String, String>,
        working_dir: Utf8PathBuf,
    ) -> Self {
        Self {
            stdout,
            stderr,
            environment,
            working_dir,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let result = match Cli::try_parse_from(args) {
            Ok(cli) => self.execute(&cli),
            Err(error) if !error.use_stderr() => write!(self.stdout, "{error}")
                .map(|()| ExitCode::SUCCESS)
                .map_err(AppError::Output),
            Err(error) => Err(AppError::CliUsage(error)),
        };

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, cli: &Cli) -> Result<ExitCode, AppError> {
        let settings = TelemetrySettings::resolve(
            cli.log_filter.as_deref(),
            cli.log_format,
            &self.environment,
        );
        telemetry::initialise(&settings)?;

        if GENERATE_VERBS.contains(&cli.command.as_str()) {
            let target = cli.file.as_deref().ok_or(AppError::MissingScaffoldPath)?;
            let path = scaffold::generate(target, &self.working_dir)?;
            info!(target: CLI_TARGET, %path, "generated descriptor");
            return Ok(ExitCode::SUCCESS);
        }

        let config = self.load_config(cli)?;
        match cli.command.as_str() {
            DUMP_CONFIG_VERB => self.dump_config(&config),
            verb if LifecycleCommand::is_controller_verb(verb) => self.control(cli, verb, &config),
            verb => self.launch(verb, &cli.args, &config),
        }
    }

    fn load_config(&self, cli: &Cli) -> Result<Config, AppError> {
        let descriptor =
            resolve_descriptor(cli.file.as_deref(), &self.environment, &self.working_dir)?;
        let stage = cli
            .stage
            .clone()
            .or_else(|| self.environment.get(STAGE_ENV_VAR).cloned())
            .filter(|stage| !stage.is_empty())
            .unwrap_or_else(|| DEFAULT_STAGE.to_owned());
        let context = AssemblyContext::new(descriptor, stage)
            .with_environment(self.environment.clone())
            .with_working_dir(self.working_dir.clone());
        Ok(load(&context)?)
    }

    fn dump_config(&mut self, config: &Config) -> Result<ExitCode, AppError> {
        let rendered = serde_json::to_string_pretty(config).map_err(AppError::Render)?;
        writeln!(self.stdout, "{rendered}").map_err(AppError::Output)?;
        Ok(ExitCode::SUCCESS)
    }

    fn control(&mut self, cli: &Cli, verb: &str, config: &Config) -> Result<ExitCode, AppError> {
        let invocation = LifecycleInvocation {
            command: verb.parse()?,
            timeout: Duration::from_secs(cli.timeout),
            quiet: cli.quiet,
        };
        let context = LifecycleContext { config };
        let mut output = LifecycleOutput::new(&mut *self.stdout, &mut *self.stderr);
        Ok(Controller::new().handle(invocation, context, &mut output)?)
    }

    fn launch(
        &mut self,
        verb: &str,
        args: &[String],
        config: &Config,
    ) -> Result<ExitCode, AppError> {
        let launcher = Launcher::new(config, SystemProcess);
        match launcher.run(verb, args)? {
            Launched::Help { verbs } => {
                writeln!(self.stdout, "Valid commands: {}", verbs.join(", "))
                    .map_err(AppError::Output)?;
            }
            Launched::AlreadyRunning { pid } => {
                writeln!(self.stderr, "{} already running with PID {pid}.", config.name())
                    .map_err(AppError::Output)?;
            }
            Launched::Spawned { pid } => {
                info!(target: CLI_TARGET, pid, name = config.name(), "service started");
            }
            Launched::Replaced => {}
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Captures the process environment, skipping entries that are not UTF-8.
#[must_use]
pub fn environment_snapshot() -> BTreeMap<String, String> {
    env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn working_dir() -> Utf8PathBuf {
    env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("/"))
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// The environment and working directory are captured from the running
/// process.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    CliRunner::new(stdout, stderr, environment_snapshot(), working_dir()).run(args)
}
