//! Engine configuration.
//!
//! The configuration record is machine-written: it is mutated over the
//! control surface (`UPDATE_CONFIG`) and persisted by the [`Store`], never
//! edited by hand. Field names on disk keep the camelCase spelling of the
//! persisted record so existing state files remain readable.
//!
//! [`Store`]: crate::store::Store

use serde::{Deserialize, Serialize};

/// Which delivery transport the engine runs.
///
/// Exactly one transport is active at a time. Switching is a
/// configuration-time decision; there is no runtime fallback negotiation
/// between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Fixed-interval HTTP fetch of the full pending set.
    #[default]
    Poll,
    /// Long-lived websocket fed one notification per frame.
    Push,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Poll => write!(f, "poll"),
            TransportKind::Push => write!(f, "push"),
        }
    }
}

/// Runtime configuration for the notification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base HTTP endpoint of the task server, e.g. `http://tasks.example.com`.
    #[serde(rename = "serverUrl", default)]
    pub server_url: String,
    /// Subject code identifying whose notifications the engine tracks.
    #[serde(rename = "umCode", default)]
    pub um_code: String,
    /// Whether alerts should request sound from the OS notifier.
    #[serde(rename = "soundEnabled", default = "default_sound_enabled")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub transport: TransportKind,
    /// Poll period in seconds. Deployment profiles use 10 or 30.
    #[serde(rename = "pollIntervalSecs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_sound_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            um_code: String::new(),
            sound_enabled: true,
            transport: TransportKind::default(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl EngineConfig {
    /// Whether the engine may attempt any transport activity.
    ///
    /// Incomplete configuration suppresses transports entirely; it is not
    /// an error and is recovered only by an explicit config update.
    pub fn is_complete(&self) -> bool {
        !self.server_url.trim().is_empty() && !self.um_code.trim().is_empty()
    }

    /// Deep link into the web application for a task.
    pub fn task_url(&self, task_id: i64) -> String {
        format!("{}/#/tasks/{}", self.server_url.trim_end_matches('/'), task_id)
    }
}
