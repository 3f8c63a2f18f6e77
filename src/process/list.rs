use crate::error::{Result, SigPanelError};
use crate::process::types::{ProcessDetails, ProcessEntry, ProcessSnapshot};
use crate::state::PreviousSelections;
use std::collections::HashSet;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};

/// Session and desktop plumbing nobody wants to signal
const IGNORED_PROCESS_NAMES: &[&str] = &[
    "systemd",
    "plasmashell",
    "(sd-pam)",
    "sudo",
    "kwin_x11",
    "kded5",
    "ksmserver",
    "dbus-daemon",
    "xdg-desktop-portal",
    "xdg-permission-store",
    "xdg-document-portal",
    "xdg-user-dirs",
    "pipewire",
    "wireplumber",
    "pulseaudio",
    "NetworkManager",
    "wpa_supplicant",
    "avahi-daemon",
    "cupsd",
    "gsd-",
    "gnome-session-",
    "x-session-manager",
    "init",
    "dockerd",
    "containerd",
    "snapd",
    "udevd",
    "journald",
    "rsyslogd",
    "crond",
    "atd",
    "sshd",
    "agetty",
    "login",
    "polkitd",
    "upowerd",
    "thermald",
    "colord",
    "accounts-daemon",
    "rtkit-daemon",
    "dconf-service",
    "gdm-x-session",
    "gdm-session-worker",
    "gdm",
    "lightdm",
    "sddm",
    "Xorg",
    "Xwayland",
];

/// Substrings that hide a process wherever they appear in its name
const IGNORED_NAME_FRAGMENTS: &[&str] = &["gsd-", "gnome-session-"];

/// True for names on the built-in ignore list
pub fn is_builtin_ignored(name: &str) -> bool {
    IGNORED_PROCESS_NAMES.contains(&name)
}

/// Decides which snapshots make it into the list and in what order
#[derive(Debug, Clone, Default)]
pub struct ProcessFilter {
    /// Case-insensitive substring; empty matches everything
    pub search: String,
    /// Only processes whose real uid matches
    pub uid: Option<u32>,
    /// Names hidden in addition to the built-in list
    pub extra_ignored: Vec<String>,
}

impl ProcessFilter {
    pub fn new(search: impl Into<String>, uid: Option<u32>) -> Self {
        Self {
            search: search.into(),
            uid,
            extra_ignored: Vec::new(),
        }
    }

    pub fn with_extra_ignored(mut self, names: Vec<String>) -> Self {
        self.extra_ignored = names;
        self
    }

    fn is_ignored(&self, name: &str) -> bool {
        is_builtin_ignored(name)
            || self.extra_ignored.iter().any(|n| n == name)
            || IGNORED_NAME_FRAGMENTS.iter().any(|f| name.contains(f))
    }

    fn accepts(&self, snapshot: &ProcessSnapshot) -> bool {
        if !snapshot
            .name
            .to_lowercase()
            .contains(&self.search.to_lowercase())
        {
            return false;
        }

        if let Some(uid) = self.uid {
            if snapshot.uid != Some(uid) {
                return false;
            }
        }

        !self.is_ignored(&snapshot.name) && !snapshot.looks_like_daemon()
    }

    /// Filter, keep the first snapshot per name, then sort recently used
    /// names first. The sort is stable so the rest keep their input order.
    pub fn apply(
        &self,
        snapshots: &[ProcessSnapshot],
        previous: &PreviousSelections,
    ) -> Vec<ProcessEntry> {
        let mut seen = HashSet::new();
        let mut entries: Vec<ProcessEntry> = snapshots
            .iter()
            .filter(|s| self.accepts(s))
            .filter(|s| seen.insert(s.name.clone()))
            .map(ProcessSnapshot::to_entry)
            .collect();

        entries.sort_by_key(|e| previous.rank(&e.name));
        entries
    }
}

/// Reads the process table through sysinfo
pub struct ProcessLister {
    system: System,
    users: Users,
}

impl ProcessLister {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            users: Users::new_with_refreshed_list(),
        }
    }

    /// Fresh snapshot of every process, ordered by PID
    pub fn snapshot(&mut self) -> Vec<ProcessSnapshot> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_user(UpdateKind::OnlyIfNotSet),
        );

        let mut snapshots: Vec<ProcessSnapshot> = self
            .system
            .processes()
            .values()
            .map(|p| {
                let pid = p.pid().as_u32();
                ProcessSnapshot {
                    pid,
                    parent: p.parent().map(|pp| pp.as_u32()),
                    name: p.name().to_string_lossy().to_string(),
                    uid: p.user_id().map(|uid| **uid),
                    user: self.user_name(p.user_id()),
                    status: p.status().to_string(),
                    has_terminal: has_controlling_terminal(pid),
                }
            })
            .collect();

        snapshots.sort_by_key(|s| s.pid);
        snapshots
    }

    /// The filtered, sorted list the panel shows
    pub fn list(
        &mut self,
        filter: &ProcessFilter,
        previous: &PreviousSelections,
    ) -> Vec<ProcessEntry> {
        let snapshots = self.snapshot();
        let entries = filter.apply(&snapshots, previous);
        tracing::debug!(
            "Listed {} of {} processes (search: {:?})",
            entries.len(),
            snapshots.len(),
            filter.search
        );
        entries
    }

    /// Details for a PID, or for the first process with exactly this name
    pub fn details(&mut self, target: &str) -> Result<ProcessDetails> {
        self.system.refresh_memory();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new()
                .with_cpu()
                .with_memory()
                .with_user(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        let pid = match target.trim().parse::<u32>() {
            Ok(pid) => Pid::from_u32(pid),
            Err(_) => self.find_by_name(target)?,
        };

        let process = self
            .system
            .process(pid)
            .ok_or_else(|| SigPanelError::ProcessNotFound(format!("PID {}", pid)))?;

        let total_memory = self.system.total_memory();
        let memory_percent = if total_memory > 0 {
            process.memory() as f64 / total_memory as f64 * 100.0
        } else {
            0.0
        };

        Ok(ProcessDetails {
            name: process.name().to_string_lossy().to_string(),
            pid: pid.as_u32(),
            user: self.user_name(process.user_id()),
            status: process.status().to_string(),
            cpu_percent: process.cpu_usage(),
            memory_percent,
            command: process
                .cmd()
                .iter()
                .map(|s| s.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(" "),
        })
    }

    fn find_by_name(&self, name: &str) -> Result<Pid> {
        let mut matches: Vec<Pid> = self
            .system
            .processes()
            .values()
            .filter(|p| p.name().to_string_lossy() == name)
            .map(|p| p.pid())
            .collect();
        matches.sort();

        match matches.len() {
            0 => Err(SigPanelError::ProcessNotFound(name.to_string())),
            1 => Ok(matches[0]),
            n => {
                tracing::warn!(
                    "Multiple processes found with name '{}' ({}), showing the first one",
                    name,
                    n
                );
                Ok(matches[0])
            }
        }
    }

    fn user_name(&self, uid: Option<&sysinfo::Uid>) -> String {
        uid.and_then(|uid| self.users.get_user_by_id(uid))
            .map(|u| u.name().to_string())
            .or_else(|| uid.map(|uid| (**uid).to_string()))
            .unwrap_or_else(|| "?".to_string())
    }
}

impl Default for ProcessLister {
    fn default() -> Self {
        Self::new()
    }
}

/// Real uid of the calling process
#[cfg(unix)]
pub fn current_uid() -> Option<u32> {
    Some(nix::unistd::getuid().as_raw())
}

#[cfg(not(unix))]
pub fn current_uid() -> Option<u32> {
    None
}

/// `tty_nr` from /proc/<pid>/stat is non-zero. Unreadable means no terminal.
fn has_controlling_terminal(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| parse_tty_nr(&stat))
        .map(|tty| tty != 0)
        .unwrap_or(false)
}

/// The command name may contain spaces and parentheses, so fields are
/// counted from the last `)`: state, ppid, pgrp, session, tty_nr.
fn parse_tty_nr(stat: &str) -> Option<i64> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(4)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pid: u32, name: &str, uid: u32) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            parent: Some(500),
            name: name.to_string(),
            uid: Some(uid),
            user: "alice".to_string(),
            status: "Sleeping".to_string(),
            has_terminal: true,
        }
    }

    #[test]
    fn test_parse_tty_nr() {
        let stat = "1234 (my (weird) proc) S 1 1234 1234 34817 1234 4194304 0 0";
        assert_eq!(parse_tty_nr(stat), Some(34817));
        assert_eq!(parse_tty_nr("1 (init) S 0 1 1 0 -1"), Some(0));
        assert_eq!(parse_tty_nr("garbage"), None);
    }

    #[test]
    fn test_filter_hides_other_users_ignored_and_daemons() {
        let mut daemon = snap(5, "baloo_file", 1000);
        daemon.parent = Some(1);
        daemon.has_terminal = false;

        let snapshots = vec![
            snap(1, "firefox", 1000),
            snap(2, "plasmashell", 1000),
            snap(3, "gsd-color", 1000),
            snap(4, "firefox-root", 0),
            daemon,
            snap(6, "kate", 1000),
        ];

        let filter = ProcessFilter::new("", Some(1000));
        let names: Vec<String> = filter
            .apply(&snapshots, &PreviousSelections::default())
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(names, vec!["firefox", "kate"]);
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let snapshots = vec![snap(1, "Firefox", 1000), snap(2, "kate", 1000)];
        let filter = ProcessFilter::new("FIRE", None);
        let entries = filter.apply(&snapshots, &PreviousSelections::default());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Firefox");
    }

    #[test]
    fn test_filter_keeps_first_pid_per_name() {
        let snapshots = vec![snap(10, "chrome", 1000), snap(11, "chrome", 1000)];
        let entries =
            ProcessFilter::new("", None).apply(&snapshots, &PreviousSelections::default());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pid, 10);
    }

    #[test]
    fn test_filter_sorts_previous_selections_first() {
        let snapshots = vec![
            snap(1, "alpha", 1000),
            snap(2, "bravo", 1000),
            snap(3, "charlie", 1000),
            snap(4, "delta", 1000),
        ];
        let previous =
            PreviousSelections::from_names(vec!["delta".to_string(), "bravo".to_string()]);

        let names: Vec<String> = ProcessFilter::new("", None)
            .apply(&snapshots, &previous)
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(names, vec!["delta", "bravo", "alpha", "charlie"]);
    }

    #[test]
    fn test_filter_extra_ignored() {
        let snapshots = vec![snap(1, "steam", 1000), snap(2, "kate", 1000)];
        let filter = ProcessFilter::new("", None).with_extra_ignored(vec!["steam".to_string()]);
        let entries = filter.apply(&snapshots, &PreviousSelections::default());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "kate");
    }

    #[test]
    fn test_lister_sees_current_process() {
        let mut lister = ProcessLister::new();
        let own_pid = std::process::id();
        assert!(lister.snapshot().iter().any(|s| s.pid == own_pid));
    }

    #[test]
    fn test_current_uid_owns_this_process() {
        let uid = current_uid();
        assert!(uid.is_some());

        let mut lister = ProcessLister::new();
        let own = lister
            .snapshot()
            .into_iter()
            .find(|s| s.pid == std::process::id())
            .unwrap();
        assert_eq!(own.uid, uid);
    }

    #[test]
    fn test_details_by_pid() {
        let mut lister = ProcessLister::new();
        let details = lister.details(&std::process::id().to_string()).unwrap();

        assert_eq!(details.pid, std::process::id());
        assert!(!details.name.is_empty());
        assert!(details.memory_percent >= 0.0);
    }

    #[test]
    fn test_details_unknown_name() {
        let mut lister = ProcessLister::new();
        let result = lister.details("definitely-not-a-running-process-name");
        assert!(matches!(result, Err(SigPanelError::ProcessNotFound(_))));
    }
}
