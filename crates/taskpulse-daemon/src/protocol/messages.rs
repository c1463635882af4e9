use serde::{Deserialize, Serialize};

use taskpulse_core::{EngineConfig, Notification, NotificationId, StatusIndicator};

/// Client -> Daemon request messages.
///
/// Each variant maps to a JSONL message with `"type"` as the tag field.
/// All requests carry an `id` field for response correlation. The tags keep
/// the web client's SCREAMING_CASE spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "GET_NOTIFICATIONS")]
    GetNotifications { id: String },

    #[serde(rename = "GET_STATUS")]
    GetStatus { id: String },

    /// Persist a new configuration and restart the transport under it.
    #[serde(rename = "UPDATE_CONFIG")]
    UpdateConfig { id: String, config: EngineConfig },

    #[serde(rename = "MARK_AS_READ")]
    MarkAsRead {
        id: String,
        notification_id: NotificationId,
    },

    /// Respond to a task, then re-sync the ledger out of band.
    #[serde(rename = "RESPOND_TASK")]
    RespondTask { id: String, task_id: i64 },

    #[serde(rename = "DAEMON_STOP")]
    DaemonStop { id: String },

    #[serde(rename = "PING")]
    Ping { id: String },
}

impl ClientMessage {
    /// Extract the request ID from any client message.
    pub fn id(&self) -> &str {
        match self {
            ClientMessage::GetNotifications { id }
            | ClientMessage::GetStatus { id }
            | ClientMessage::UpdateConfig { id, .. }
            | ClientMessage::MarkAsRead { id, .. }
            | ClientMessage::RespondTask { id, .. }
            | ClientMessage::DaemonStop { id }
            | ClientMessage::Ping { id } => id,
        }
    }
}

/// Daemon -> Client response messages.
///
/// Every request produces exactly one response echoing its `id`; the caller
/// is a transient attachment waiting for that single reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonMessage {
    #[serde(rename = "notification_list")]
    NotificationList {
        id: String,
        notifications: Vec<Notification>,
    },

    #[serde(rename = "status")]
    Status {
        id: String,
        connected: bool,
        config: EngineConfig,
        indicator: StatusIndicator,
    },

    /// Outcome of a respond action. Failures travel as data, never as a
    /// broken connection.
    #[serde(rename = "respond_result")]
    RespondResult {
        id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Deep link to the task, present on success so the UI can open it.
        #[serde(skip_serializing_if = "Option::is_none")]
        task_url: Option<String>,
    },

    #[serde(rename = "ack")]
    Ack { id: String },

    #[serde(rename = "error")]
    Error {
        id: String,
        code: String,
        message: String,
    },
}
