//! Entrypoint for the `freud` launcher.
//!
//! The binary delegates to [`freud_cli::run`], which resolves the descriptor,
//! assembles the configuration and either controls or launches the service.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    freud_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
