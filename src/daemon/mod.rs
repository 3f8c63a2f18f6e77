// Daemon module - Single-instance background process

pub mod daemonize;
pub mod launcher;
pub mod lock;
pub mod manager;
pub mod pid;
#[cfg(unix)]
pub mod runner;

pub use daemonize::daemonize;
pub use launcher::{check_args, launch, Launch, LaunchMode};
pub use lock::InstanceLock;
pub use manager::{DaemonManager, DaemonStatus, StopOutcome};
pub use pid::PidFile;

use crate::config::PanelConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the daemon needs, with paths made absolute before any
/// `chdir("/")`
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub lock_file: PathBuf,
    pub pid_file: PathBuf,
    pub log_file: Option<PathBuf>,
    pub poll_interval: Duration,
    pub settings_path: PathBuf,
}

impl DaemonOptions {
    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            lock_file: absolute(&config.daemon.lock_file),
            pid_file: absolute(&config.daemon.pid_file),
            log_file: config.daemon.log_file.as_deref().map(absolute),
            poll_interval: config.poll_interval(),
            settings_path: absolute(&config.settings_path()),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_dir(dir: &Path) -> Self {
        Self {
            lock_file: dir.join("sigpanel.lock"),
            pid_file: dir.join("sigpanel.pid"),
            log_file: None,
            poll_interval: Duration::from_millis(100),
            settings_path: dir.join("settings.json"),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
