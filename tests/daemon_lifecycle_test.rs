// Integration tests for the daemon lifecycle through the built binary

use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_sigpanel");

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let sandbox = Self { dir };

        let config = format!(
            r#"
[daemon]
lock_file = "{}"
pid_file = "{}"
poll_interval_ms = 100

[settings]
path = "{}"
"#,
            sandbox.lock_file().display(),
            sandbox.pid_file().display(),
            sandbox.dir.path().join("settings.json").display(),
        );
        fs::write(sandbox.config_file(), config).unwrap();
        sandbox
    }

    fn config_file(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn lock_file(&self) -> PathBuf {
        self.dir.path().join("sigpanel.lock")
    }

    fn pid_file(&self) -> PathBuf {
        self.dir.path().join("sigpanel.pid")
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(BIN);
        command
            .arg("--config")
            .arg(self.config_file())
            .args(args)
            .env_remove("SIGPANEL_LOG")
            .stdin(Stdio::null());
        command
    }

    fn output(&self, args: &[&str]) -> Output {
        self.command(args).output().unwrap()
    }

    fn spawn(&self, args: &[&str]) -> Child {
        self.command(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    fn read_pid(&self) -> u32 {
        fs::read_to_string(self.pid_file())
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    condition()
}

fn wait_for_file(path: &Path) {
    assert!(
        wait_until(Duration::from_secs(5), || path.exists()),
        "{} never appeared",
        path.display()
    );
}

/// Signal-0 check; an unreaped zombie counts as gone
fn is_alive(pid: u32) -> bool {
    if kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .map(|state| state != "Z" && state != "X")
            .unwrap_or(true),
        Err(_) => false,
    }
}

fn wait_for_exit(child: &mut Child) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(25));
    }
    None
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_foreground_daemon_lifecycle() {
    let sandbox = Sandbox::new();

    let mut daemon = sandbox.spawn(&["--daemon"]);
    wait_for_file(&sandbox.pid_file());
    assert_eq!(sandbox.read_pid(), daemon.id());
    assert!(sandbox.lock_file().exists());

    // Give the runtime time to install its signal handlers
    thread::sleep(Duration::from_millis(500));

    let second = sandbox.output(&["--daemon"]);
    assert!(second.status.success());
    assert!(stdout(&second).contains("already running"));
    assert_eq!(sandbox.read_pid(), daemon.id());

    let stop = sandbox.output(&["--stop-daemon"]);
    assert!(stop.status.success());
    assert!(stdout(&stop).contains("stopped"));

    let status = wait_for_exit(&mut daemon);
    if status.is_none() {
        let _ = daemon.kill();
    }
    let status = status.expect("daemon did not exit after SIGTERM");
    assert!(status.success());

    assert!(!sandbox.pid_file().exists());
    assert!(!sandbox.lock_file().exists());
}

#[test]
fn test_lock_released_after_daemon_stops() {
    let sandbox = Sandbox::new();

    let mut first = sandbox.spawn(&["--daemon"]);
    wait_for_file(&sandbox.pid_file());
    thread::sleep(Duration::from_millis(500));
    assert!(sandbox.output(&["--stop-daemon"]).status.success());
    assert!(wait_for_exit(&mut first).is_some());

    let mut second = sandbox.spawn(&["--daemon"]);
    wait_for_file(&sandbox.pid_file());
    assert_eq!(sandbox.read_pid(), second.id());

    thread::sleep(Duration::from_millis(500));
    assert!(sandbox.output(&["--stop-daemon"]).status.success());
    assert!(wait_for_exit(&mut second).is_some());
}

#[test]
fn test_default_invocation_starts_background_daemon() {
    let sandbox = Sandbox::new();

    // Without a terminal the panel only prints the process list
    let launcher = sandbox.output(&[]);
    assert!(launcher.status.success());

    wait_for_file(&sandbox.pid_file());
    let pid = sandbox.read_pid();
    assert!(is_alive(pid));

    // A second launcher leaves the running daemon alone
    assert!(sandbox.output(&[]).status.success());
    assert_eq!(sandbox.read_pid(), pid);

    let status = sandbox.output(&["status"]);
    assert!(status.status.success());
    assert!(stdout(&status).contains("Daemon is running"));
    assert!(stdout(&status).contains(&pid.to_string()));

    thread::sleep(Duration::from_millis(500));
    let stop = sandbox.output(&["--stop-daemon"]);
    assert!(stop.status.success());
    assert!(wait_until(Duration::from_secs(5), || !is_alive(pid)));
    assert!(!sandbox.pid_file().exists());
    assert!(!sandbox.lock_file().exists());
}

#[test]
fn test_no_daemon_flag_skips_background_daemon() {
    let sandbox = Sandbox::new();

    let launcher = sandbox.output(&["--no-daemon"]);
    assert!(launcher.status.success());
    thread::sleep(Duration::from_millis(200));
    assert!(!sandbox.pid_file().exists());
    assert!(!sandbox.lock_file().exists());
}

#[test]
fn test_stop_is_idempotent() {
    let sandbox = Sandbox::new();

    for _ in 0..2 {
        let stop = sandbox.output(&["--stop-daemon"]);
        assert!(stop.status.success());
        assert!(stdout(&stop).contains("No daemon is running"));
    }
    assert!(!sandbox.pid_file().exists());
    assert!(!sandbox.lock_file().exists());
}

#[test]
fn test_stop_removes_orphaned_lock() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.lock_file(), "").unwrap();

    let stop = sandbox.output(&["--stop-daemon"]);
    assert!(stop.status.success());
    assert!(stdout(&stop).contains("orphaned lock"));
    assert!(!sandbox.lock_file().exists());
}

#[test]
fn test_stop_with_garbage_pid_file() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.pid_file(), "not-a-pid").unwrap();
    fs::write(sandbox.lock_file(), "").unwrap();

    let stop = sandbox.output(&["--stop-daemon"]);
    assert!(stop.status.success());
    assert!(!sandbox.pid_file().exists());
    assert!(!sandbox.lock_file().exists());
}

#[test]
fn test_status_when_not_running() {
    let sandbox = Sandbox::new();

    let status = sandbox.output(&["status"]);
    assert!(status.status.success());
    assert!(stdout(&status).contains("not running"));
}
