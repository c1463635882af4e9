//! Typed IPC client for the daemon's control surface.
//!
//! Connects to the daemon's Unix socket and provides one method per
//! supported operation. Used by the CLI and the integration tests; any
//! other detached surface can speak the same JSONL protocol directly.

use std::path::Path;

use tokio::io::BufReader;
use tokio::net::UnixStream;
use tracing::debug;

use taskpulse_core::{EngineConfig, Notification, NotificationId, StatusIndicator};

use crate::errors::DaemonError;
use crate::protocol::codec::{read_message, write_message};
use crate::protocol::messages::{ClientMessage, DaemonMessage};

/// Engine status as reported over the control surface.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub connected: bool,
    pub config: EngineConfig,
    pub indicator: StatusIndicator,
}

/// Outcome of a respond action.
#[derive(Debug, Clone)]
pub struct RespondReply {
    pub success: bool,
    pub error: Option<String>,
    pub task_url: Option<String>,
}

pub struct DaemonClient {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
    next_id: u64,
}

impl DaemonClient {
    /// Connect to the daemon at the given socket path.
    pub async fn connect(socket_path: &Path) -> Result<Self, DaemonError> {
        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused
                || e.kind() == std::io::ErrorKind::NotFound
            {
                DaemonError::NotRunning {
                    path: socket_path.display().to_string(),
                }
            } else {
                DaemonError::ConnectionFailed {
                    message: e.to_string(),
                }
            }
        })?;

        let (reader, writer) = stream.into_split();

        debug!(
            event = "daemon.client.connected",
            socket = %socket_path.display(),
        );

        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
        })
    }

    fn next_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("req-{}", id)
    }

    /// Send a request and read its single response.
    async fn request(&mut self, msg: &ClientMessage) -> Result<DaemonMessage, DaemonError> {
        write_message(&mut self.writer, msg).await?;
        let response: DaemonMessage = read_message(&mut self.reader)
            .await?
            .ok_or_else(|| DaemonError::ConnectionFailed {
                message: "connection closed".to_string(),
            })?;
        Ok(response)
    }

    fn check_error(response: &DaemonMessage) -> Result<(), DaemonError> {
        if let DaemonMessage::Error { code, message, .. } = response {
            return Err(DaemonError::Remote {
                code: code.clone(),
                message: message.clone(),
            });
        }
        Ok(())
    }

    /// Current ledger snapshot, newest first.
    pub async fn get_notifications(&mut self) -> Result<Vec<Notification>, DaemonError> {
        let id = self.next_id();
        let response = self.request(&ClientMessage::GetNotifications { id }).await?;
        Self::check_error(&response)?;

        if let DaemonMessage::NotificationList { notifications, .. } = response {
            Ok(notifications)
        } else {
            Err(DaemonError::Protocol {
                message: "unexpected response to GET_NOTIFICATIONS".to_string(),
            })
        }
    }

    pub async fn get_status(&mut self) -> Result<StatusReport, DaemonError> {
        let id = self.next_id();
        let response = self.request(&ClientMessage::GetStatus { id }).await?;
        Self::check_error(&response)?;

        if let DaemonMessage::Status {
            connected,
            config,
            indicator,
            ..
        } = response
        {
            Ok(StatusReport {
                connected,
                config,
                indicator,
            })
        } else {
            Err(DaemonError::Protocol {
                message: "unexpected response to GET_STATUS".to_string(),
            })
        }
    }

    /// Persist a new configuration; the daemon restarts its transport.
    pub async fn update_config(&mut self, config: &EngineConfig) -> Result<(), DaemonError> {
        let id = self.next_id();
        let response = self
            .request(&ClientMessage::UpdateConfig {
                id,
                config: config.clone(),
            })
            .await?;
        Self::check_error(&response)?;
        Ok(())
    }

    pub async fn mark_as_read(&mut self, notification_id: &NotificationId) -> Result<(), DaemonError> {
        let id = self.next_id();
        let response = self
            .request(&ClientMessage::MarkAsRead {
                id,
                notification_id: notification_id.clone(),
            })
            .await?;
        Self::check_error(&response)?;
        Ok(())
    }

    /// Respond to a task. The reply is always structured; a failed action
    /// is `success == false`, not an `Err`.
    pub async fn respond_task(&mut self, task_id: i64) -> Result<RespondReply, DaemonError> {
        let id = self.next_id();
        let response = self.request(&ClientMessage::RespondTask { id, task_id }).await?;
        Self::check_error(&response)?;

        if let DaemonMessage::RespondResult {
            success,
            error,
            task_url,
            ..
        } = response
        {
            Ok(RespondReply {
                success,
                error,
                task_url,
            })
        } else {
            Err(DaemonError::Protocol {
                message: "unexpected response to RESPOND_TASK".to_string(),
            })
        }
    }

    pub async fn ping(&mut self) -> Result<(), DaemonError> {
        let id = self.next_id();
        let response = self.request(&ClientMessage::Ping { id }).await?;
        Self::check_error(&response)?;
        Ok(())
    }

    /// Ask the daemon to shut down.
    pub async fn shutdown(&mut self) -> Result<(), DaemonError> {
        let id = self.next_id();
        let response = self.request(&ClientMessage::DaemonStop { id }).await?;
        Self::check_error(&response)?;
        Ok(())
    }
}
