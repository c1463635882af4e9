use taskpulse_core::PulseError;

/// Error communicating with or inside the daemon.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("Daemon is not running (socket not found at {path})")]
    NotRunning { path: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("IPC protocol error: {message}")]
    Protocol { message: String },

    #[error("Daemon returned error: {code}: {message}")]
    Remote { code: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PulseError for DaemonError {
    fn error_code(&self) -> &'static str {
        match self {
            DaemonError::NotRunning { .. } => "DAEMON_NOT_RUNNING",
            DaemonError::ConnectionFailed { .. } => "DAEMON_CONNECTION_FAILED",
            DaemonError::Protocol { .. } => "DAEMON_PROTOCOL_ERROR",
            DaemonError::Remote { .. } => "DAEMON_REMOTE_ERROR",
            DaemonError::Io(_) => "DAEMON_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, DaemonError::NotRunning { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_is_user_error() {
        let error = DaemonError::NotRunning {
            path: "/tmp/daemon.sock".to_string(),
        };
        assert!(error.is_user_error());
        assert_eq!(error.error_code(), "DAEMON_NOT_RUNNING");
    }

    #[test]
    fn test_remote_error_display() {
        let error = DaemonError::Remote {
            code: "store_error".to_string(),
            message: "disk full".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Daemon returned error: store_error: disk full"
        );
    }
}
