// Desktop module - KWin introspection through the qdbus6 command-line bridge

use crate::error::{Result, SigPanelError};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

const KWIN_SERVICE: &str = "org.kde.KWin";

/// Runs `qdbus6` against KWin
#[derive(Debug, Clone)]
pub struct KWinBridge {
    program: String,
}

impl Default for KWinBridge {
    fn default() -> Self {
        Self::new("qdbus6")
    }
}

impl KWinBridge {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Ask KWin to let the user click a window and describe it
    pub fn query_window_info(&self) -> Result<String> {
        let output = std::process::Command::new(&self.program)
            .args([KWIN_SERVICE, "/KWin", "queryWindowInfo"])
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let detail = [stderr, stdout]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or_else(|| output.status.to_string());
            return Err(SigPanelError::BridgeFailed(detail));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Process name of the window the user clicks
    pub fn pick_process_name(&self) -> Result<String> {
        let info = self.query_window_info()?;
        tracing::debug!("queryWindowInfo output: {}", info);
        parse_resource_name(&info).ok_or(SigPanelError::NoResourceName)
    }

    /// Identifier of the active virtual desktop
    pub async fn current_desktop(&self) -> Result<String> {
        let output = tokio::process::Command::new(&self.program)
            .args([
                KWIN_SERVICE,
                "/VirtualDesktopManager",
                "org.kde.KWin.VirtualDesktopManager.current",
            ])
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(SigPanelError::BridgeFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn spawn_error(&self, e: std::io::Error) -> SigPanelError {
        if e.kind() == ErrorKind::NotFound {
            SigPanelError::BridgeMissing
        } else {
            SigPanelError::BridgeFailed(format!("{}: {}", self.program, e))
        }
    }
}

/// Second token of the first line mentioning `resourceName`
pub fn parse_resource_name(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("resourceName"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

/// The active desktop switched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopChange {
    pub previous: String,
    pub current: String,
}

/// Polls KWin for the active desktop and reports switches
pub struct DesktopWatcher {
    bridge: KWinBridge,
    ticker: Interval,
    last: Option<String>,
}

impl DesktopWatcher {
    /// Must be called inside a tokio runtime
    pub fn new(bridge: KWinBridge, period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            bridge,
            ticker,
            last: None,
        }
    }

    /// Wait for the next desktop switch. When the bridge is missing this
    /// never resolves.
    pub async fn next_change(&mut self) -> DesktopChange {
        loop {
            self.ticker.tick().await;

            match self.bridge.current_desktop().await {
                Ok(desktop) => {
                    if let Some(change) = self.observe(desktop) {
                        return change;
                    }
                }
                Err(SigPanelError::BridgeMissing) => {
                    tracing::warn!("qdbus6 not found, desktop changes will not be observed");
                    std::future::pending::<()>().await;
                }
                Err(e) => tracing::debug!("Desktop query failed: {}", e),
            }
        }
    }

    /// Record a sample; the first one only sets the baseline
    fn observe(&mut self, desktop: String) -> Option<DesktopChange> {
        if desktop.is_empty() {
            return None;
        }

        match self.last.replace(desktop.clone()) {
            Some(previous) if previous != desktop => Some(DesktopChange {
                previous,
                current: desktop,
            }),
            _ => None,
        }
    }
}
