// Daemon main loop

use super::lock::InstanceLock;
use super::manager::DaemonManager;
use super::DaemonOptions;
use crate::desktop::{DesktopChange, DesktopWatcher, KWinBridge};
use crate::error::{Result, SigPanelError};
use crate::settings::JsonSettingsStore;
use crate::state::AutoToggleList;
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};

/// Reacts to desktop switches
pub trait DesktopListener {
    fn on_desktop_changed(&mut self, change: &DesktopChange);
}

/// Reports switches together with the processes flagged for auto-toggle.
/// Suspending and resuming them is not implemented.
pub struct AutoToggleObserver {
    settings_path: PathBuf,
}

impl AutoToggleObserver {
    pub fn new(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    fn flagged(&self) -> AutoToggleList {
        match JsonSettingsStore::open(&self.settings_path) {
            Ok(store) => AutoToggleList::load(&store),
            Err(e) => {
                tracing::warn!("{}", e);
                AutoToggleList::default()
            }
        }
    }
}

impl DesktopListener for AutoToggleObserver {
    fn on_desktop_changed(&mut self, change: &DesktopChange) {
        tracing::info!(
            "Active desktop changed: {} -> {}",
            change.previous,
            change.current
        );

        let flagged = self.flagged();
        if !flagged.names().is_empty() {
            tracing::debug!(
                "Auto-toggle processes configured ({}), no action taken",
                flagged.names().join(", ")
            );
        }
    }
}

/// Removes lock and PID files when the daemon leaves, on every path out.
/// Owns the lock so the descriptor stays open until the files are gone.
struct CleanupGuard {
    manager: DaemonManager,
    pid: u32,
    lock: InstanceLock,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        tracing::info!("Daemon (PID: {}) exiting, removing lock and PID files", self.pid);
        self.manager.cleanup_owned_by(self.pid, &self.lock);
    }
}

/// Run the daemon until SIGTERM or SIGINT. The PID file must already be
/// written; `lock` is held for the whole run.
pub fn run(options: &DaemonOptions, lock: InstanceLock) -> Result<()> {
    tracing::info!("Holding instance lock {}", lock.path().display());
    let _guard = CleanupGuard {
        manager: DaemonManager::from_options(options),
        pid: std::process::id(),
        lock,
    };

    // Built here rather than in main: the runtime must not exist across fork
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SigPanelError::DaemonRuntimeError(e.to_string()))?;

    let mut observer = AutoToggleObserver::new(options.settings_path.clone());
    runtime.block_on(event_loop(options, &mut observer))
}

async fn event_loop<L: DesktopListener>(options: &DaemonOptions, listener: &mut L) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| SigPanelError::DaemonRuntimeError(format!("SIGTERM handler: {}", e)))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| SigPanelError::DaemonRuntimeError(format!("SIGINT handler: {}", e)))?;

    let mut watcher = DesktopWatcher::new(KWinBridge::default(), options.poll_interval);

    tracing::info!(
        "Daemon running (PID: {}), polling desktop every {:?}",
        std::process::id(),
        options.poll_interval
    );

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
                break;
            }
            change = watcher.next_change() => {
                listener.on_desktop_changed(&change);
            }
        }
    }

    Ok(())
}
