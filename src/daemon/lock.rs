// Single-instance guard backed by an advisory file lock

use crate::error::{Result, SigPanelError};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// An exclusive `flock` on the lock file.
///
/// Dropping the value closes this descriptor only. The lock stays held as
/// long as any forked copy of the descriptor is open, so a parent can drop
/// its copy after forking without releasing the daemon's lock.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    file: File,
}

impl InstanceLock {
    /// Try to become the single instance.
    ///
    /// * `Ok(Some(lock))` - lock obtained
    /// * `Ok(None)` - another process holds it, or the file cannot be
    ///   created for a recoverable reason
    /// * `Err(_)` - any other filesystem failure
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref().to_path_buf();

        let file = match OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if matches!(e.kind(), ErrorKind::PermissionDenied | ErrorKind::NotFound) => {
                tracing::warn!("Cannot create lock file {}: {}", path.display(), e);
                return Ok(None);
            }
            Err(e) => {
                return Err(SigPanelError::LockFileError(
                    path.display().to_string(),
                    e.to_string(),
                ))
            }
        };

        if lock_exclusive_nonblocking(&file, &path)? {
            tracing::debug!("Acquired instance lock {}", path.display());
            Ok(Some(Self { path, file }))
        } else {
            tracing::debug!("Instance lock {} is held elsewhere", path.display());
            Ok(None)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the lock file. The lock itself ends when the last descriptor
    /// closes.
    pub fn remove_file(&self) -> Result<()> {
        remove_lock_file(&self.path)
    }

    /// True while the file at `path` is the one this lock holds. False once
    /// it was removed or replaced by another instance's lock file.
    #[cfg(unix)]
    pub fn is_current(&self) -> bool {
        use std::os::unix::fs::MetadataExt;

        match (self.file.metadata(), fs::metadata(&self.path)) {
            (Ok(held), Ok(on_disk)) => held.dev() == on_disk.dev() && held.ino() == on_disk.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    pub fn is_current(&self) -> bool {
        self.file.metadata().is_ok() && self.path.exists()
    }

    /// Delete the lock file only if it is still ours
    pub fn remove_if_current(&self) -> Result<bool> {
        if !self.is_current() {
            return Ok(false);
        }
        self.remove_file()?;
        Ok(true)
    }
}

/// Remove a lock file, treating "already gone" as success
pub fn remove_lock_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SigPanelError::LockFileError(
            path.display().to_string(),
            e.to_string(),
        )),
    }
}

#[cfg(unix)]
fn lock_exclusive_nonblocking(file: &File, path: &Path) -> Result<bool> {
    use nix::errno::Errno;
    use nix::libc;
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }

    match Errno::last() {
        errno if errno == Errno::EWOULDBLOCK => Ok(false),
        errno => Err(SigPanelError::LockError(
            path.display().to_string(),
            errno.desc().to_string(),
        )),
    }
}

#[cfg(not(unix))]
fn lock_exclusive_nonblocking(_file: &File, _path: &Path) -> Result<bool> {
    Err(SigPanelError::Unsupported)
}
