//! Pidfile handles and signal-based liveness probing.
//!
//! A [`Pidfile`] holds nothing but a path: every query re-reads the file so
//! concurrent launchers observe each other's writes. Liveness is decided by
//! sending the null signal through a [`ProcessProbe`]; the system probe maps
//! `ESRCH` to "not running" and `EPERM` to "running as another user".

use std::env;
use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::paths::normalise;

pub use nix::sys::signal::Signal;

const PIDFILE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pidfile");

/// Errors raised while reading, writing or signalling through a pidfile.
#[derive(Debug, Error)]
pub enum PidfileError {
    /// Creating or writing the pidfile failed.
    #[error("failed to write pid file '{path}': {source}")]
    Write {
        /// Pidfile path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The liveness probe failed for a reason other than a missing process or
    /// a permission check.
    #[error("failed to check process {pid}: {source}")]
    Probe {
        /// PID that failed to probe.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Delivering a signal failed.
    #[error("failed to send {signal} to process {pid}: {source}")]
    Signal {
        /// PID recorded in the pidfile.
        pid: u32,
        /// Signal that could not be delivered.
        signal: Signal,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Result of probing a pid with the null signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The process exists and accepts signals from this user.
    Alive,
    /// No process with that pid exists.
    NotFound,
    /// The process exists but belongs to another user.
    Forbidden,
}

impl ProbeOutcome {
    /// Whether the outcome counts as a running process.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Alive | Self::Forbidden)
    }
}

/// Capability to probe and signal processes by pid.
pub trait ProcessProbe {
    /// Probes `pid` without affecting it.
    ///
    /// # Errors
    ///
    /// Returns the OS error for failures other than a missing process or a
    /// permission check.
    fn probe(&self, pid: u32) -> Result<ProbeOutcome, Errno>;

    /// Delivers `signal` to `pid`.
    ///
    /// # Errors
    ///
    /// Returns the OS error reported by the delivery attempt.
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno>;
}

/// Probe backed by `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn probe(&self, pid: u32) -> Result<ProbeOutcome, Errno> {
        match kill(raw_pid(pid)?, None) {
            Ok(()) => Ok(ProbeOutcome::Alive),
            Err(Errno::EPERM) => Ok(ProbeOutcome::Forbidden),
            Err(Errno::ESRCH) => Ok(ProbeOutcome::NotFound),
            Err(errno) => Err(errno),
        }
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        kill(raw_pid(pid)?, signal)
    }
}

fn raw_pid(pid: u32) -> Result<Pid, Errno> {
    // pid 0 and negative values address process groups, never a single service.
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(Errno::EINVAL),
    }
}

/// Handle to a file holding the decimal pid of the managed service.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Pidfile {
    path: Utf8PathBuf,
}

impl Pidfile {
    /// Wraps `path` without touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the pidfile.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Creates or truncates the pidfile and records `pid`.
    ///
    /// Missing parent directories are created first.
    ///
    /// # Errors
    ///
    /// Returns [`PidfileError::Write`] when the file cannot be written.
    pub fn write(&self, pid: u32) -> Result<(), PidfileError> {
        let write_error = |source| PidfileError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let mut file = fs::File::create(&self.path).map_err(write_error)?;
        write!(file, "{pid}").map_err(write_error)?;
        file.sync_all().map_err(write_error)?;
        info!(
            target: PIDFILE_TARGET,
            pid,
            file = %self.path,
            "pid file written"
        );
        Ok(())
    }

    /// Reads the recorded pid.
    ///
    /// Returns `None` when the path is empty, the file is missing or
    /// unreadable, or its content does not start with a usable pid.
    #[must_use]
    pub fn read(&self) -> Option<u32> {
        if self.path.as_str().is_empty() {
            return None;
        }
        let content = fs::read_to_string(&self.path).ok()?;
        parse_pid(&content)
    }

    /// Reports whether the recorded pid belongs to a live process.
    ///
    /// # Errors
    ///
    /// Returns [`PidfileError::Probe`] when the probe fails unexpectedly.
    pub fn is_running(&self) -> Result<bool, PidfileError> {
        self.is_running_with(&SystemProbe)
    }

    /// Reports liveness using the supplied probe.
    ///
    /// # Errors
    ///
    /// Returns [`PidfileError::Probe`] when the probe fails unexpectedly.
    pub fn is_running_with<P>(&self, probe: &P) -> Result<bool, PidfileError>
    where
        P: ProcessProbe + ?Sized,
    {
        self.running_pid_with(probe).map(|pid| pid.is_some())
    }

    /// Returns the recorded pid when it belongs to a live process.
    ///
    /// # Errors
    ///
    /// Returns [`PidfileError::Probe`] when the probe fails unexpectedly.
    pub fn running_pid_with<P>(&self, probe: &P) -> Result<Option<u32>, PidfileError>
    where
        P: ProcessProbe + ?Sized,
    {
        let Some(pid) = self.read() else {
            return Ok(None);
        };
        let outcome = probe
            .probe(pid)
            .map_err(|source| PidfileError::Probe { pid, source })?;
        debug!(
            target: PIDFILE_TARGET,
            pid,
            ?outcome,
            file = %self.path,
            "probed recorded pid"
        );
        Ok(outcome.is_running().then_some(pid))
    }

    /// Sends `signal` to the recorded pid, returning the pid signalled.
    ///
    /// Does nothing when no pid is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`PidfileError::Signal`] when delivery fails, including for a
    /// process that no longer exists.
    pub fn kill(&self, signal: Signal) -> Result<Option<u32>, PidfileError> {
        self.kill_with(&SystemProbe, signal)
    }

    /// Sends `signal` through the supplied probe.
    ///
    /// # Errors
    ///
    /// Returns [`PidfileError::Signal`] when delivery fails.
    pub fn kill_with<P>(&self, probe: &P, signal: Signal) -> Result<Option<u32>, PidfileError>
    where
        P: ProcessProbe + ?Sized,
    {
        let Some(pid) = self.read() else {
            return Ok(None);
        };
        probe
            .signal(pid, signal)
            .map_err(|source| PidfileError::Signal {
                pid,
                signal,
                source,
            })?;
        info!(
            target: PIDFILE_TARGET,
            pid,
            %signal,
            "signal delivered"
        );
        Ok(Some(pid))
    }

    fn absolute(&self) -> Utf8PathBuf {
        if self.path.is_absolute() {
            return normalise(&self.path);
        }
        env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .map_or_else(|| normalise(&self.path), |dir| normalise(&dir.join(&self.path)))
    }
}

impl PartialEq for Pidfile {
    fn eq(&self, other: &Self) -> bool {
        self.absolute() == other.absolute()
    }
}

impl Eq for Pidfile {}

impl std::fmt::Display for Pidfile {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.path.as_str())
    }
}

/// Parses the leading decimal number of `content`, mirroring permissive
/// integer parsing: whitespace and a `+` sign are skipped and trailing junk is
/// ignored.
fn parse_pid(content: &str) -> Option<u32> {
    let trimmed = content.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_len = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    let pid = unsigned.get(..digits_len)?.parse::<u32>().ok()?;
    (pid > 0 && i32::try_from(pid).is_ok()).then_some(pid)
}
