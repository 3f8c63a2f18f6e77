// PID file management for the daemon process

use crate::error::{Result, SigPanelError};
use chrono::{DateTime, Local};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The daemon's PID, as decimal text in a file
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write the current process PID to the file
    pub fn write_current(&self) -> Result<u32> {
        let pid = std::process::id();
        self.write(pid)?;
        Ok(pid)
    }

    pub fn write(&self, pid: u32) -> Result<()> {
        fs::write(&self.path, pid.to_string())
            .map_err(|e| SigPanelError::PidWriteError(format!("{}: {}", self.path.display(), e)))
    }

    /// Read the PID from the file. Zero is rejected.
    pub fn read(&self) -> Result<u32> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SigPanelError::PidReadError(format!("{}: {}", self.path.display(), e)))?;

        match content.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(SigPanelError::InvalidPid(content.trim().to_string())),
            Ok(pid) => Ok(pid),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the PID file; a missing file is fine
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SigPanelError::PidWriteError(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// When the PID file was last written
    pub fn written_at(&self) -> Option<DateTime<Local>> {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Probe a PID with signal 0
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }

    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true, // exists, owned by someone else
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}
