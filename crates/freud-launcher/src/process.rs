//! Operating system seam for replacing or spawning processes.

use std::fs::{self, OpenOptions};
use std::io;
use std::os::fd::RawFd;
use std::os::unix::process::CommandExt;
use std::process::{self, Command, Stdio};

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, FdFlag, fcntl};
use tracing::{debug, info};

use crate::PROCESS_TARGET;
use crate::invocation::{ErrorSink, Invocation};

const SHELL: &str = "/bin/sh";
const FD_DIRS: [&str; 2] = ["/proc/self/fd", "/dev/fd"];
const FIRST_INHERITED_FD: RawFd = 3;

/// Abstraction over the process primitives the launcher needs.
pub trait ProcessControl {
    /// Replaces the current process image with `invocation`.
    ///
    /// Implementations backed by the operating system only return on
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while preparing or executing the command.
    fn exec(&self, invocation: &Invocation) -> io::Result<()>;

    /// Starts `invocation` as a detached child and returns its pid.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while preparing or spawning the command.
    fn spawn(&self, invocation: &Invocation) -> io::Result<u32>;

    /// Pid of the current process.
    fn pid(&self) -> u32;
}

/// Process control backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcess;

impl SystemProcess {
    /// Builds a new system process backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessControl for SystemProcess {
    fn exec(&self, invocation: &Invocation) -> io::Result<()> {
        let mut command = build_command(invocation)?;
        close_inherited_descriptors()?;
        Err(command.exec())
    }

    fn spawn(&self, invocation: &Invocation) -> io::Result<u32> {
        let mut command = build_command(invocation)?;
        close_inherited_descriptors()?;
        let child = command.spawn()?;
        let pid = child.id();
        info!(
            target: PROCESS_TARGET,
            pid,
            command = %invocation.command,
            "spawned background process"
        );
        Ok(pid)
    }

    fn pid(&self) -> u32 {
        process::id()
    }
}

/// Marks every descriptor above stderr close-on-exec.
///
/// Descriptors the launcher inherited from its own parent may lack the flag;
/// the child must only see the three standard streams.
fn close_inherited_descriptors() -> io::Result<()> {
    let listing = FD_DIRS
        .iter()
        .find_map(|dir| fs::read_dir(dir).ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no descriptor listing"))?;
    let descriptors: Vec<RawFd> = listing
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .filter(|fd| *fd >= FIRST_INHERITED_FD)
        .collect();

    for fd in descriptors {
        match mark_close_on_exec(fd) {
            // The listing's own descriptor is closed by now.
            Ok(()) | Err(Errno::EBADF) => {}
            Err(errno) => return Err(errno.into()),
        }
    }
    debug!(target: PROCESS_TARGET, "inherited descriptors marked close-on-exec");
    Ok(())
}

fn mark_close_on_exec(fd: RawFd) -> Result<(), Errno> {
    let current = FdFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFD)?);
    if current.contains(FdFlag::FD_CLOEXEC) {
        return Ok(());
    }
    fcntl(fd, FcntlArg::F_SETFD(current | FdFlag::FD_CLOEXEC)).map(drop)
}

/// Translates an invocation into a `/bin/sh -c` command.
fn build_command(invocation: &Invocation) -> io::Result<Command> {
    let options = &invocation.options;
    let mut command = Command::new(SHELL);
    command
        .arg("-c")
        .arg(&invocation.command)
        .current_dir(&options.chdir)
        .stdin(Stdio::null());
    if options.reset_env {
        command.env_clear();
    }
    command.envs(&invocation.env);
    match &options.stderr {
        ErrorSink::Inherit => {
            command.stdout(Stdio::from(io::stderr())).stderr(Stdio::inherit());
        }
        ErrorSink::Append(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            command.stdout(file.try_clone()?).stderr(file);
        }
    }
    if options.process_group {
        command.process_group(0);
    }
    Ok(command)
}
