// Launcher decision logic: stop, foreground daemon, or panel with a
// background daemon alongside

use super::daemonize::daemonize;
use super::lock::InstanceLock;
use super::manager::{DaemonManager, StopOutcome};
#[cfg(unix)]
use super::pid::PidFile;
use super::DaemonOptions;
use crate::error::Result;
#[cfg(not(unix))]
use crate::error::SigPanelError;

/// How the binary was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// `--stop-daemon`
    StopDaemon,
    /// `--daemon`
    Daemon,
    /// No daemon flag. `spawn_daemon` is false under `--no-daemon`.
    Interactive { spawn_daemon: bool },
}

/// What the caller should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Open the interactive panel
    ShowPanel,
    /// Print `message` (if any) and exit with `code`
    Exit { code: i32, message: Option<String> },
}

/// Decide and perform the daemon side of an invocation.
///
/// * `StopDaemon` stops the daemon and always ends with exit status 0
/// * `Daemon` runs the main loop in this process if the lock is free,
///   otherwise reports that a daemon is already running
/// * `Interactive` starts a background daemon when the lock is free and
///   always asks for the panel
pub fn launch(mode: LaunchMode, options: &DaemonOptions) -> Result<Launch> {
    match mode {
        LaunchMode::StopDaemon => {
            let outcome = DaemonManager::from_options(options).stop_daemon();
            Ok(Launch::Exit {
                code: 0,
                message: Some(outcome.message()),
            })
        }

        LaunchMode::Daemon => match InstanceLock::try_acquire(&options.lock_file)? {
            Some(lock) => Ok(run_foreground(options, lock)),
            None => Ok(Launch::Exit {
                code: 0,
                message: Some("Daemon is already running".to_string()),
            }),
        },

        LaunchMode::Interactive { spawn_daemon } => {
            if spawn_daemon {
                start_background(options)?;
            }
            Ok(Launch::ShowPanel)
        }
    }
}

/// `launch`, exiting the process for every outcome except the panel.
/// Returns whether the panel should be shown, which is always true when it
/// returns at all.
pub fn check_args(mode: LaunchMode, options: &DaemonOptions) -> Result<bool> {
    match launch(mode, options)? {
        Launch::ShowPanel => Ok(true),
        Launch::Exit { code, message } => {
            if let Some(message) = message {
                if code == 0 {
                    crate::cli::output::print_info(&message);
                } else {
                    crate::cli::output::print_error(&message);
                }
            }
            std::process::exit(code)
        }
    }
}

#[cfg(unix)]
fn run_foreground(options: &DaemonOptions, lock: InstanceLock) -> Launch {
    let pid_file = PidFile::new(&options.pid_file);
    if let Err(e) = pid_file.write_current() {
        if let Err(cleanup) = lock.remove_file() {
            tracing::warn!("{}", cleanup);
        }
        return Launch::Exit {
            code: 1,
            message: Some(e.to_string()),
        };
    }

    match super::runner::run(options, lock) {
        Ok(()) => Launch::Exit {
            code: 0,
            message: None,
        },
        Err(e) => Launch::Exit {
            code: 1,
            message: Some(e.to_string()),
        },
    }
}

#[cfg(not(unix))]
fn run_foreground(_options: &DaemonOptions, lock: InstanceLock) -> Launch {
    if let Err(cleanup) = lock.remove_file() {
        tracing::warn!("{}", cleanup);
    }
    Launch::Exit {
        code: 1,
        message: Some(SigPanelError::Unsupported.to_string()),
    }
}

/// Daemon contention and daemonization failures never block the panel
fn start_background(options: &DaemonOptions) -> Result<()> {
    let Some(lock) = InstanceLock::try_acquire(&options.lock_file)? else {
        tracing::debug!("Daemon already running, not starting another");
        return Ok(());
    };

    match daemonize(options, lock, false) {
        Ok(_) => tracing::info!("Started background daemon"),
        Err(e) => {
            tracing::warn!("Could not start background daemon: {}", e);
            if let Err(cleanup) = super::lock::remove_lock_file(&options.lock_file) {
                tracing::warn!("{}", cleanup);
            }
        }
    }

    Ok(())
}
