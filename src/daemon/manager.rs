// Daemon lifecycle management

use super::lock::{remove_lock_file, InstanceLock};
use super::pid::{is_process_alive, PidFile};
use super::DaemonOptions;
use crate::error::{Result, SigPanelError};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// What the stop command found and did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// SIGTERM delivered, files removed
    Stopped { pid: u32 },
    /// PID file present but the signal could not be delivered; files removed
    SignalFailed { reason: String },
    /// Lock file without a PID file; lock removed, nothing signalled
    OrphanedLock,
    /// Neither file exists
    NotRunning,
}

impl StopOutcome {
    pub fn message(&self) -> String {
        match self {
            StopOutcome::Stopped { pid } => format!("Daemon (PID: {}) stopped", pid),
            StopOutcome::SignalFailed { reason } => {
                format!("Could not signal daemon ({}), removed stale files", reason)
            }
            StopOutcome::OrphanedLock => "No daemon found, removed orphaned lock file".to_string(),
            StopOutcome::NotRunning => "No daemon is running".to_string(),
        }
    }
}

/// Daemon status information
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub since: Option<DateTime<Local>>,
    pub pid_file: PathBuf,
    pub lock_file: PathBuf,
}

/// Inspects and stops the daemon through its lock and PID files
pub struct DaemonManager {
    lock_file: PathBuf,
    pid_file: PidFile,
}

impl DaemonManager {
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(lock_file: P1, pid_file: P2) -> Self {
        Self {
            lock_file: lock_file.as_ref().to_path_buf(),
            pid_file: PidFile::new(pid_file),
        }
    }

    pub fn from_options(options: &DaemonOptions) -> Self {
        Self::new(&options.lock_file, &options.pid_file)
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    /// Send SIGTERM to the recorded daemon and remove its files.
    /// Never waits for the process to exit.
    pub fn stop_daemon(&self) -> StopOutcome {
        if self.pid_file.exists() {
            let outcome = match self.pid_file.read().and_then(send_terminate) {
                Ok(pid) => {
                    tracing::info!("Sent SIGTERM to daemon (PID: {})", pid);
                    StopOutcome::Stopped { pid }
                }
                Err(e) => {
                    tracing::warn!("Failed to signal daemon: {}", e);
                    StopOutcome::SignalFailed {
                        reason: e.to_string(),
                    }
                }
            };
            self.cleanup();
            return outcome;
        }

        if self.lock_file.exists() {
            tracing::info!("Removing orphaned lock file {}", self.lock_file.display());
            if let Err(e) = remove_lock_file(&self.lock_file) {
                tracing::warn!("{}", e);
            }
            return StopOutcome::OrphanedLock;
        }

        StopOutcome::NotRunning
    }

    /// Remove both files, logging failures
    pub fn cleanup(&self) {
        if let Err(e) = self.pid_file.remove() {
            tracing::warn!("{}", e);
        }
        if let Err(e) = remove_lock_file(&self.lock_file) {
            tracing::warn!("{}", e);
        }
    }

    /// Remove the files left by the exiting daemon `pid`. The PID file stays
    /// when it names another process; the lock file stays unless it is still
    /// the file `lock` holds.
    pub fn cleanup_owned_by(&self, pid: u32, lock: &InstanceLock) {
        match self.pid_file.read() {
            Ok(recorded) if recorded != pid => {
                tracing::info!(
                    "PID file now belongs to {}, leaving lock and PID files in place",
                    recorded
                );
                return;
            }
            _ => {
                if let Err(e) = self.pid_file.remove() {
                    tracing::warn!("{}", e);
                }
            }
        }

        match lock.remove_if_current() {
            Ok(true) => {}
            Ok(false) => tracing::info!(
                "Lock file {} was replaced, leaving it in place",
                lock.path().display()
            ),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    pub fn status(&self) -> DaemonStatus {
        let pid = self.pid_file.read().ok().filter(|pid| is_process_alive(*pid));

        DaemonStatus {
            running: pid.is_some(),
            pid,
            since: pid.and_then(|_| self.pid_file.written_at()),
            pid_file: self.pid_file.path().to_path_buf(),
            lock_file: self.lock_file.clone(),
        }
    }
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> Result<u32> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // 0, 1 and anything that would turn negative address groups or init
    let raw = i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 1)
        .ok_or_else(|| SigPanelError::InvalidPid(pid.to_string()))?;

    kill(Pid::from_raw(raw), Signal::SIGTERM)
        .map_err(|e| SigPanelError::Other(format!("Failed to send SIGTERM to {}: {}", pid, e)))?;

    Ok(pid)
}

#[cfg(not(unix))]
fn send_terminate(_pid: u32) -> Result<u32> {
    Err(SigPanelError::Unsupported)
}
