use crate::error::{Result, SigPanelError};
use crate::process::SignalAction;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_LOCK_FILE: &str = "/tmp/sigpanel.lock";
const DEFAULT_PID_FILE: &str = "/tmp/sigpanel.pid";

/// Top-level configuration loaded from `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub signals: SignalConfig,

    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Paths and timing for the background daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Advisory lock used as the single-instance token
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// File holding the daemon's decimal PID
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    /// Daemon stderr goes here instead of /dev/null when set
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Desktop polling period in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// How signals are delivered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// External executable invoked as `<sig_command> <signal> <names...>`
    #[serde(default = "default_sig_command")]
    pub sig_command: String,

    /// Signal preselected when nothing was used before
    #[serde(default = "default_signal")]
    pub default_signal: String,

    /// Extra process names hidden from the list
    #[serde(default)]
    pub ignored_processes: Vec<String>,
}

/// Where the preference store lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Default value functions for serde
fn default_lock_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOCK_FILE)
}

fn default_pid_file() -> PathBuf {
    PathBuf::from(DEFAULT_PID_FILE)
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_sig_command() -> String {
    "sig".to_string()
}

fn default_signal() -> String {
    "toggle".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
            pid_file: default_pid_file(),
            log_file: None,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sig_command: default_sig_command(),
            default_signal: default_signal(),
            ignored_processes: Vec::new(),
        }
    }
}

impl PanelConfig {
    /// Load from an explicit path, or from the user config dir when it exists.
    /// A missing default file yields the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SigPanelError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::parse_toml(&contents)?;
        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| SigPanelError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.daemon.lock_file.as_os_str().is_empty() {
            return Err(SigPanelError::ConfigValidationError(
                "daemon.lock_file must not be empty".to_string(),
            ));
        }

        if self.daemon.pid_file.as_os_str().is_empty() {
            return Err(SigPanelError::ConfigValidationError(
                "daemon.pid_file must not be empty".to_string(),
            ));
        }

        if self.daemon.lock_file == self.daemon.pid_file {
            return Err(SigPanelError::ConfigValidationError(
                "daemon.lock_file and daemon.pid_file must differ".to_string(),
            ));
        }

        if !(100..=60_000).contains(&self.daemon.poll_interval_ms) {
            return Err(SigPanelError::ConfigValidationError(format!(
                "daemon.poll_interval_ms must be between 100 and 60000, got {}",
                self.daemon.poll_interval_ms
            )));
        }

        if self.signals.sig_command.trim().is_empty() {
            return Err(SigPanelError::ConfigValidationError(
                "signals.sig_command must not be empty".to_string(),
            ));
        }

        self.signals
            .default_signal
            .parse::<SignalAction>()
            .map_err(|_| {
                SigPanelError::ConfigValidationError(format!(
                    "Invalid signals.default_signal: {}. Must be one of: {}",
                    self.signals.default_signal,
                    SignalAction::ALL
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;

        Ok(())
    }

    /// Expand environment variables in path fields
    fn expand_env_vars(&mut self) {
        self.daemon.lock_file = expand_env_in_path(&self.daemon.lock_file);
        self.daemon.pid_file = expand_env_in_path(&self.daemon.pid_file);

        // An empty log_file in TOML means "no log file"
        self.daemon.log_file = self
            .daemon
            .log_file
            .take()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| expand_env_in_path(&p));

        self.settings.path = self
            .settings
            .path
            .take()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| expand_env_in_path(&p));
    }

    /// Desktop polling period
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.daemon.poll_interval_ms)
    }

    /// Path of the JSON preference store
    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .path
            .clone()
            .or_else(|| project_dirs().map(|d| d.config_dir().join("settings.json")))
            .unwrap_or_else(|| PathBuf::from("/tmp/sigpanel-settings.json"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "sigpanel")
}

/// `$XDG_CONFIG_HOME/sigpanel/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Expand `$VAR` and `${VAR}` in a string. `$VAR` takes the longest run of
/// `[A-Za-z0-9_]`; unset variables are left as written.
fn expand_env_in_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('$') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        let value = if name.is_empty() {
            None
        } else {
            std::env::var(name).ok()
        };

        match value {
            Some(value) => {
                result.push_str(&value);
                rest = &after[consumed..];
            }
            None => {
                result.push('$');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_env_in_string(&path_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();

        assert_eq!(config.daemon.lock_file, PathBuf::from("/tmp/sigpanel.lock"));
        assert_eq!(config.daemon.pid_file, PathBuf::from("/tmp/sigpanel.pid"));
        assert!(config.daemon.log_file.is_none());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.signals.sig_command, "sig");
        assert_eq!(config.signals.default_signal, "toggle");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_content = r#"
            [daemon]
            pid_file = "/run/user/1000/sigpanel.pid"

            [signals]
            ignored_processes = ["baloo_file"]
        "#;

        let config = PanelConfig::parse_toml(toml_content).unwrap();
        assert_eq!(config.daemon.lock_file, PathBuf::from("/tmp/sigpanel.lock"));
        assert_eq!(
            config.daemon.pid_file,
            PathBuf::from("/run/user/1000/sigpanel.pid")
        );
        assert_eq!(config.signals.ignored_processes, vec!["baloo_file"]);
        assert_eq!(config.signals.sig_command, "sig");
    }

    #[test]
    fn test_validate_same_paths() {
        let mut config = PanelConfig::default();
        config.daemon.pid_file = config.daemon.lock_file.clone();

        assert!(matches!(
            config.validate(),
            Err(SigPanelError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validate_poll_interval_bounds() {
        let mut config = PanelConfig::default();
        config.daemon.poll_interval_ms = 10;
        assert!(config.validate().is_err());

        config.daemon.poll_interval_ms = 120_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_default_signal() {
        let mut config = PanelConfig::default();
        config.signals.default_signal = "BOGUS".to_string();

        assert!(matches!(
            config.validate(),
            Err(SigPanelError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_from_file_expands_env_and_drops_empty_log_file() {
        std::env::set_var("SIGPANEL_TEST_RUNDIR", "/tmp/sigpanel-test");

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            [daemon]
            lock_file = "${SIGPANEL_TEST_RUNDIR}/daemon.lock"
            pid_file = "$SIGPANEL_TEST_RUNDIR/daemon.pid"
            log_file = ""
            "#,
        )
        .unwrap();

        let config = PanelConfig::from_file(&config_path).unwrap();
        assert_eq!(
            config.daemon.lock_file,
            PathBuf::from("/tmp/sigpanel-test/daemon.lock")
        );
        assert_eq!(
            config.daemon.pid_file,
            PathBuf::from("/tmp/sigpanel-test/daemon.pid")
        );
        assert!(config.daemon.log_file.is_none());
    }

    #[test]
    fn test_expand_prefers_longest_variable_name() {
        std::env::set_var("SIGPANEL_TEST_BASE", "/short");
        std::env::set_var("SIGPANEL_TEST_BASE_DIR", "/long");

        assert_eq!(
            expand_env_in_string("$SIGPANEL_TEST_BASE_DIR/daemon.lock"),
            "/long/daemon.lock"
        );
        assert_eq!(
            expand_env_in_string("$SIGPANEL_TEST_BASE/daemon.lock"),
            "/short/daemon.lock"
        );
        assert_eq!(
            expand_env_in_string("${SIGPANEL_TEST_BASE}_DIR/x"),
            "/short_DIR/x"
        );
    }

    #[test]
    fn test_expand_leaves_unknown_and_malformed_references() {
        std::env::remove_var("SIGPANEL_TEST_UNSET");

        assert_eq!(
            expand_env_in_string("$SIGPANEL_TEST_UNSET/a"),
            "$SIGPANEL_TEST_UNSET/a"
        );
        assert_eq!(expand_env_in_string("${SIGPANEL_TEST_UNSET"), "${SIGPANEL_TEST_UNSET");
        assert_eq!(expand_env_in_string("/tmp/cost$"), "/tmp/cost$");
        assert_eq!(expand_env_in_string("/tmp/$/x"), "/tmp/$/x");
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[daemon\nlock_file = 3").unwrap();

        assert!(matches!(
            PanelConfig::from_file(&config_path),
            Err(SigPanelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = PanelConfig::load(Some(Path::new("/nonexistent/sigpanel.toml")));
        assert!(matches!(result, Err(SigPanelError::ConfigError(_))));
    }

    #[test]
    fn test_settings_path_override() {
        let mut config = PanelConfig::default();
        config.settings.path = Some(PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/prefs.json"));
    }
}
