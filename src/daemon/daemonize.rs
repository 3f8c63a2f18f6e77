// Daemonization support for Unix systems

use super::lock::InstanceLock;
use super::DaemonOptions;
use crate::error::{Result, SigPanelError};

/// Detach into a background daemon holding `lock`.
///
/// With `detach_caller` the calling process exits once the first fork
/// succeeds. Without it the caller gets `Ok(true)` back and keeps running;
/// its copy of the lock descriptor is closed, the daemon keeps the lock.
///
/// The daemon itself never returns from here: it runs the main loop and
/// exits.
#[cfg(unix)]
pub fn daemonize(options: &DaemonOptions, lock: InstanceLock, detach_caller: bool) -> Result<bool> {
    use nix::sys::wait::waitpid;
    use nix::unistd::{fork, ForkResult};

    // First fork
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            if detach_caller {
                std::process::exit(0);
            }

            drop(lock);
            // The intermediate child exits right after the second fork
            if let Err(e) = waitpid(child, None) {
                tracing::debug!("waitpid on intermediate child failed: {}", e);
            }
            return Ok(true);
        }
        Ok(ForkResult::Child) => {}
        Err(e) => {
            return Err(SigPanelError::DaemonizeError(format!(
                "First fork failed: {}",
                e
            )))
        }
    }

    // From here on we are a forked child and must never return to the caller
    detach_child(options, lock)
}

#[cfg(unix)]
fn detach_child(options: &DaemonOptions, lock: InstanceLock) -> ! {
    use nix::libc;
    use nix::sys::stat::{umask, Mode};
    use nix::unistd::{fork, setsid, ForkResult};

    // Create new session and become session leader
    if let Err(e) = setsid() {
        tracing::error!("setsid failed: {}", e);
        abandon(&lock, 1);
    }

    // Second fork so the daemon is not a session leader and cannot
    // acquire a controlling terminal
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => unsafe { libc::_exit(0) },
        Ok(ForkResult::Child) => {}
        Err(e) => {
            tracing::error!("Second fork failed: {}", e);
            abandon(&lock, 1);
        }
    }

    if let Err(e) = std::env::set_current_dir("/") {
        tracing::error!("Failed to change directory to /: {}", e);
        abandon(&lock, 1);
    }
    umask(Mode::empty());

    let pid_file = super::pid::PidFile::new(&options.pid_file);
    match pid_file.write_current() {
        Ok(pid) => tracing::info!("Daemon started (PID: {})", pid),
        Err(e) => {
            tracing::error!("{}", e);
            abandon(&lock, 1);
        }
    }

    if let Err(e) = redirect_stdio(options) {
        tracing::error!("Failed to redirect standard streams: {}", e);
        let _ = pid_file.remove();
        abandon(&lock, 1);
    }

    let code = match super::runner::run(options, lock) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("Daemon failed: {}", e);
            1
        }
    };
    std::process::exit(code)
}

/// Remove the lock file and exit without running the main loop
#[cfg(unix)]
fn abandon(lock: &InstanceLock, code: i32) -> ! {
    if let Err(e) = lock.remove_file() {
        tracing::warn!("{}", e);
    }
    std::process::exit(code)
}

/// stdin and stdout go to /dev/null; stderr to the log file when one is
/// configured, otherwise /dev/null as well
#[cfg(unix)]
fn redirect_stdio(options: &DaemonOptions) -> Result<()> {
    use nix::libc;
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    let devnull = OpenOptions::new().read(true).write(true).open("/dev/null")?;

    let stderr_target = match &options.log_file {
        Some(path) => OpenOptions::new().create(true).append(true).open(path)?,
        None => devnull.try_clone()?,
    };

    let devnull_fd = devnull.as_raw_fd();
    let stderr_fd = stderr_target.as_raw_fd();

    // Redirect standard file descriptors
    let results = unsafe {
        [
            libc::dup2(devnull_fd, libc::STDIN_FILENO),
            libc::dup2(devnull_fd, libc::STDOUT_FILENO),
            libc::dup2(stderr_fd, libc::STDERR_FILENO),
        ]
    };

    if results.iter().any(|rc| *rc < 0) {
        return Err(std::io::Error::last_os_error().into());
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize(_options: &DaemonOptions, _lock: InstanceLock, _detach_caller: bool) -> Result<bool> {
    Err(SigPanelError::Unsupported)
}
