use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::protocol::codec::{read_message, write_message};
use crate::protocol::messages::{ClientMessage, DaemonMessage};

/// Handle a single control-surface connection.
///
/// Reads JSONL requests, dispatches them against the engine, and writes
/// exactly one response per request. The connection stays open until the
/// client detaches or the daemon shuts down, so a handler that performs
/// asynchronous work keeps the channel alive until its result is ready.
pub async fn handle_connection(
    stream: UnixStream,
    engine: Arc<Mutex<Engine>>,
    shutdown: tokio_util::sync::CancellationToken,
) {
    debug!(event = "daemon.connection.accepted");

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        tokio::select! {
            result = read_message::<_, ClientMessage>(&mut reader) => {
                match result {
                    Ok(Some(msg)) => {
                        let response = dispatch_message(msg, &engine, &shutdown).await;
                        if let Err(e) = write_message(&mut writer, &response).await {
                            error!(
                                event = "daemon.connection.write_failed",
                                error = %e,
                            );
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!(event = "daemon.connection.closed");
                        break;
                    }
                    Err(e) => {
                        warn!(
                            event = "daemon.connection.read_error",
                            error = %e,
                        );
                        break;
                    }
                }
            }
            _ = shutdown.cancelled() => {
                debug!(event = "daemon.connection.shutdown");
                break;
            }
        }
    }
}

/// Dispatch one request against the engine and build its response.
async fn dispatch_message(
    msg: ClientMessage,
    engine: &Arc<Mutex<Engine>>,
    shutdown: &tokio_util::sync::CancellationToken,
) -> DaemonMessage {
    match msg {
        ClientMessage::GetNotifications { id } => {
            let engine = engine.lock().await;
            DaemonMessage::NotificationList {
                id,
                notifications: engine.snapshot(),
            }
        }

        ClientMessage::GetStatus { id } => {
            let engine = engine.lock().await;
            DaemonMessage::Status {
                id,
                connected: engine.transport_state().is_active(),
                config: engine.config().clone(),
                indicator: engine.indicator(),
            }
        }

        ClientMessage::UpdateConfig { id, config } => {
            let mut engine = engine.lock().await;
            match engine.apply_config(config).await {
                Ok(()) => DaemonMessage::Ack { id },
                Err(e) => DaemonMessage::Error {
                    id,
                    code: "store_error".to_string(),
                    message: e.to_string(),
                },
            }
        }

        ClientMessage::MarkAsRead {
            id,
            notification_id,
        } => {
            let mut engine = engine.lock().await;
            engine.mark_read(&notification_id);
            DaemonMessage::Ack { id }
        }

        ClientMessage::RespondTask { id, task_id } => {
            let mut engine = engine.lock().await;
            let outcome = engine.respond_task(task_id).await;
            DaemonMessage::RespondResult {
                id,
                success: outcome.success,
                error: outcome.error,
                task_url: outcome.task_url,
            }
        }

        ClientMessage::DaemonStop { id } => {
            info!(event = "daemon.server.stop_requested");
            shutdown.cancel();
            DaemonMessage::Ack { id }
        }

        ClientMessage::Ping { id } => DaemonMessage::Ack { id },
    }
}
