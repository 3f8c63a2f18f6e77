// Settings module - Persistent key-value preference storage

use crate::error::{Result, SigPanelError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Key for the last signal chosen in the panel
pub const LAST_SIGNAL_KEY: &str = "SigPanel/last_signal";
/// Key for the last selected process name
pub const LAST_SELECTION_KEY: &str = "SigPanel/last_selected_process";
/// Key for the most-recently-used process names
pub const PREVIOUS_SELECTIONS_KEY: &str = "SigPanel/previous_selections";
/// Key for processes flagged for suspend/resume on desktop switch
pub const AUTO_TOGGLE_KEY: &str = "SigPanel/auto_toggle_processes";

/// A preference store handed to the components that need one.
pub trait SettingsStore {
    /// Value stored under `key`, or `default` when absent
    fn get(&self, key: &str, default: Value) -> Value;

    /// Store `value` under `key`
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    fn get_string(&self, key: &str, default: &str) -> String {
        match self.get(key, Value::String(default.to_string())) {
            Value::String(s) => s,
            _ => default.to_string(),
        }
    }

    /// Non-string entries are skipped
    fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key, Value::Array(Vec::new())) {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_string_list(&mut self, key: &str, values: &[String]) -> Result<()> {
        let items = values.iter().cloned().map(Value::String).collect();
        self.set(key, Value::Array(items))
    }
}

/// JSON-file backed store. Every `set` rewrites the file atomically.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonSettingsStore {
    /// Open the store at `path`; a missing file starts empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Ok(Self {
                path,
                values: Map::new(),
            });
        }

        let file = File::open(&path).map_err(|e| {
            SigPanelError::SettingsLoadError(format!("Failed to open settings file: {}", e))
        })?;

        let values: Map<String, Value> =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                SigPanelError::SettingsLoadError(format!("Failed to parse settings file: {}", e))
            })?;

        Ok(Self { path, values })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigPanelError::SettingsSaveError(format!(
                    "Failed to create settings directory: {}",
                    e
                ))
            })?;
        }

        // Write to a temporary file first, then rename over the real one
        let temp_path = self.path.with_extension("tmp");

        {
            let file = File::create(&temp_path).map_err(|e| {
                SigPanelError::SettingsSaveError(format!("Failed to create temp file: {}", e))
            })?;

            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &self.values).map_err(|e| {
                SigPanelError::SettingsSaveError(format!("Failed to serialize settings: {}", e))
            })?;
            writer.flush().map_err(|e| {
                SigPanelError::SettingsSaveError(format!("Failed to flush settings: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            SigPanelError::SettingsSaveError(format!("Failed to rename settings file: {}", e))
        })?;

        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.save()
    }
}

/// In-memory store, nothing is persisted
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, Value>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
