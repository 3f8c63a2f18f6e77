use crate::error::SigPanelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signal names understood by the `sig` helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalAction {
    Toggle,
    Stop,
    Cont,
    Kill,
    Term,
    Hup,
    Int,
    Quit,
    Usr1,
    Usr2,
}

impl SignalAction {
    /// In the order the panel offers them
    pub const ALL: [SignalAction; 10] = [
        SignalAction::Toggle,
        SignalAction::Stop,
        SignalAction::Cont,
        SignalAction::Kill,
        SignalAction::Term,
        SignalAction::Hup,
        SignalAction::Int,
        SignalAction::Quit,
        SignalAction::Usr1,
        SignalAction::Usr2,
    ];

    /// The argument passed to `sig`
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Toggle => "toggle",
            SignalAction::Stop => "stop",
            SignalAction::Cont => "cont",
            SignalAction::Kill => "KILL",
            SignalAction::Term => "TERM",
            SignalAction::Hup => "HUP",
            SignalAction::Int => "INT",
            SignalAction::Quit => "QUIT",
            SignalAction::Usr1 => "USR1",
            SignalAction::Usr2 => "USR2",
        }
    }

    /// Actions that need a confirmation before being sent
    pub fn is_forceful(&self) -> bool {
        matches!(self, SignalAction::Kill)
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalAction {
    type Err = SigPanelError;

    /// Case-insensitive, with or without a `SIG` prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);

        SignalAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| SigPanelError::UnknownSignal(s.to_string()))
    }
}

/// A row of the process list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub status: String,
}

impl ProcessEntry {
    /// `name      (PID: 1, User: u, Status: s)`
    pub fn label(&self) -> String {
        format!(
            "{}      (PID: {}, User: {}, Status: {})",
            self.name, self.pid, self.user, self.status
        )
    }
}

/// Raw facts about one OS process, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub parent: Option<u32>,
    pub name: String,
    pub uid: Option<u32>,
    pub user: String,
    pub status: String,
    pub has_terminal: bool,
}

impl ProcessSnapshot {
    /// Re-parented to init (or parentless) and detached from any terminal
    pub fn looks_like_daemon(&self) -> bool {
        matches!(self.parent, None | Some(0) | Some(1)) && !self.has_terminal
    }

    pub fn to_entry(&self) -> ProcessEntry {
        ProcessEntry {
            pid: self.pid,
            name: self.name.clone(),
            user: self.user.clone(),
            status: self.status.clone(),
        }
    }
}

/// Everything `details` shows about a process
#[derive(Debug, Clone)]
pub struct ProcessDetails {
    pub name: String,
    pub pid: u32,
    pub user: String,
    pub status: String,
    pub cpu_percent: f32,
    pub memory_percent: f64,
    pub command: String,
}
