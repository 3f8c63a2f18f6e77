use thiserror::Error;

/// Main error type for sigpanel
#[derive(Debug, Error)]
pub enum SigPanelError {
    // Single-instance guard errors
    #[error("Failed to open lock file {0}: {1}")]
    LockFileError(String, String),

    #[error("Failed to lock {0}: {1}")]
    LockError(String, String),

    // PID file errors
    #[error("Failed to write PID file: {0}")]
    PidWriteError(String),

    #[error("Failed to read PID file: {0}")]
    PidReadError(String),

    #[error("Invalid PID in file: {0}")]
    InvalidPid(String),

    // Daemon errors
    #[error("Daemonization failed: {0}")]
    DaemonizeError(String),

    #[error("Daemon runtime error: {0}")]
    DaemonRuntimeError(String),

    #[error("Daemonization is only supported on Unix systems")]
    Unsupported,

    // Settings store errors
    #[error("Failed to load settings: {0}")]
    SettingsLoadError(String),

    #[error("Failed to save settings: {0}")]
    SettingsSaveError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Process and signal errors
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    #[error("No processes selected")]
    NothingSelected,

    #[error("Failed to run {0}: {1}")]
    SigCommandError(String, String),

    // Desktop bridge errors
    #[error("qdbus6 not found. Is KDE KWin running?")]
    BridgeMissing,

    #[error("Error running qdbus6: {0}")]
    BridgeFailed(String),

    #[error("Could not extract process name from KWin output")]
    NoResourceName,

    // Interactive session errors
    #[error("Prompt error: {0}")]
    PromptError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sigpanel operations
pub type Result<T> = std::result::Result<T, SigPanelError>;

impl From<dialoguer::Error> for SigPanelError {
    fn from(e: dialoguer::Error) -> Self {
        SigPanelError::PromptError(e.to_string())
    }
}
