//! Durable key-value storage surviving process restarts.
//!
//! Two records live under the store root: the configuration
//! (`config.json`) and the notification history (`history.json`). Writes
//! are atomic (temp file + rename) so a crash never leaves a torn record.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::EngineConfig;
use crate::errors::PulseError;
use crate::ledger::Notification;

pub const CONFIG_FILE: &str = "config.json";
pub const HISTORY_FILE: &str = "history.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error accessing store: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to encode record: {message}")]
    EncodeError { message: String },
}

impl PulseError for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            StoreError::IoError { .. } => "STORE_IO_ERROR",
            StoreError::EncodeError { .. } => "STORE_ENCODE_ERROR",
        }
    }
}

/// Persisted history record: `{ "notificationHistory": [...] }`.
#[derive(serde::Serialize, serde::Deserialize)]
struct HistoryRecord {
    #[serde(rename = "notificationHistory", default)]
    notification_history: Vec<Notification>,
}

/// File-backed store rooted at a directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Default store root: `~/.taskpulse`, falling back to `./.taskpulse`
    /// when the home directory cannot be determined.
    pub fn default_root() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(".taskpulse"),
            None => {
                warn!(
                    event = "core.store.home_dir_not_found",
                    "Could not determine home directory, using current directory"
                );
                PathBuf::from(".").join(".taskpulse")
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the configuration record, or `None` if none has been saved yet.
    ///
    /// A corrupt record is reported, not silently replaced; the caller
    /// decides whether to fall back to defaults.
    pub fn load_config(&self) -> Result<Option<EngineConfig>, StoreError> {
        let path = self.root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                warn!(
                    event = "core.store.config_invalid_json",
                    file = %path.display(),
                    error = %e,
                );
                Ok(None)
            }
        }
    }

    pub fn save_config(&self, config: &EngineConfig) -> Result<(), StoreError> {
        self.write_record(CONFIG_FILE, config)
    }

    /// Load the persisted notification history.
    ///
    /// A missing or unparseable record yields an empty history with a
    /// warning; history is reconstructible from the server, so losing it is
    /// never fatal.
    pub fn load_history(&self) -> Result<Vec<Notification>, StoreError> {
        let path = self.root.join(HISTORY_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str::<HistoryRecord>(&content) {
            Ok(record) => Ok(record.notification_history),
            Err(e) => {
                warn!(
                    event = "core.store.history_invalid_json",
                    file = %path.display(),
                    error = %e,
                );
                Ok(Vec::new())
            }
        }
    }

    pub fn save_history(&self, items: &[Notification]) -> Result<(), StoreError> {
        let record = HistoryRecord {
            notification_history: items.to_vec(),
        };
        self.write_record(HISTORY_FILE, &record)
    }

    fn write_record<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;

        let path = self.root.join(file);
        let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::EncodeError {
            message: e.to_string(),
        })?;

        let temp_file = path.with_extension("json.tmp");

        if let Err(e) = fs::write(&temp_file, &json) {
            cleanup_temp_file(&temp_file, &e);
            return Err(StoreError::IoError { source: e });
        }

        if let Err(e) = fs::rename(&temp_file, &path) {
            cleanup_temp_file(&temp_file, &e);
            return Err(StoreError::IoError { source: e });
        }

        Ok(())
    }
}

fn cleanup_temp_file(temp_file: &Path, original_error: &std::io::Error) {
    if let Err(cleanup_err) = fs::remove_file(temp_file) {
        warn!(
            event = "core.store.temp_file_cleanup_failed",
            temp_file = %temp_file.display(),
            original_error = %original_error,
            cleanup_error = %cleanup_err,
            message = "Failed to clean up temp file after write error"
        );
    }
}
