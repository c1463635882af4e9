//! Push channel: long-lived websocket fed one notification per frame.
//!
//! The endpoint is scheme-translated from the HTTP server URL. After the
//! socket opens, one auth frame carrying the subject code is sent; from
//! then on every text frame is decoded as a bare notification object.
//! On close the channel schedules exactly one reconnect after a fixed
//! delay and retries indefinitely until stopped.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use taskpulse_core::{
    EngineConfig, IngestMode, TransportKind, TransportState, WireNotification, ws_endpoint,
};

use crate::transport::{Delivery, TransportHandle, transport_parts};

/// Fixed reconnect delay. Flat by design: low-churn single-tenant use
/// does not justify exponential escalation.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Outbound ws ping cadence while connected.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub(crate) fn spawn(
    config: EngineConfig,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
) -> TransportHandle {
    let parts = transport_parts();
    let cancel = parts.cancel.clone();
    let task = tokio::spawn(run(config, delivery_tx, parts.state_tx, cancel.clone()));

    TransportHandle {
        kind: TransportKind::Push,
        state_rx: parts.state_rx,
        cancel,
        task,
    }
}

async fn run(
    config: EngineConfig,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
    state_tx: watch::Sender<TransportState>,
    cancel: CancellationToken,
) {
    let endpoint = match ws_endpoint(&config.server_url) {
        Ok(url) => url,
        Err(e) => {
            // A malformed endpoint cannot self-heal; wait for reconfiguration.
            warn!(event = "daemon.push.endpoint_invalid", error = %e);
            let _ = state_tx.send(TransportState::Failed);
            return;
        }
    };

    info!(event = "daemon.push.started", endpoint = %endpoint);

    let mut attempt: u32 = 0;
    loop {
        let _ = state_tx.send(TransportState::Connecting);

        match connect_async(endpoint.as_str()).await {
            Ok((ws, _)) => {
                attempt = 0;
                let _ = state_tx.send(TransportState::Active);
                info!(event = "daemon.push.connected", endpoint = %endpoint);
                session(ws, &config, &delivery_tx, &cancel).await;
            }
            Err(e) => {
                warn!(event = "daemon.push.connect_failed", error = %e);
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        attempt += 1;
        let next_retry_at =
            (chrono::Utc::now() + chrono::Duration::seconds(RECONNECT_DELAY.as_secs() as i64))
                .to_rfc3339();
        let _ = state_tx.send(TransportState::Backoff {
            attempt,
            next_retry_at,
        });
        debug!(event = "daemon.push.reconnect_scheduled", attempt = attempt);

        // One timer per disconnect; stop() aborts the wait.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }

    let _ = state_tx.send(TransportState::Idle);
    info!(event = "daemon.push.stopped");
}

/// Drive one connected session until close, error, or cancellation.
async fn session<S>(
    mut ws: S,
    config: &EngineConfig,
    delivery_tx: &mpsc::UnboundedSender<Delivery>,
    cancel: &CancellationToken,
) where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let auth = serde_json::json!({ "type": "auth", "um_code": config.um_code }).to_string();
    if let Err(e) = ws.send(Message::Text(auth)).await {
        warn!(event = "daemon.push.auth_send_failed", error = %e);
        return;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // The interval's immediate first tick would ping before the server
    // finished the handshake; burn it.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.close().await;
                return;
            }
            _ = heartbeat.tick() => {
                if let Err(e) = ws.send(Message::Ping(Vec::new())).await {
                    warn!(event = "daemon.push.heartbeat_failed", error = %e);
                    return;
                }
            }
            frame = ws.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => handle_frame(&text, delivery_tx),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(event = "daemon.push.closed_by_remote");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(event = "daemon.push.socket_error", error = %e);
                        return;
                    }
                }
            }
        }
    }
}

/// Decode one inbound frame. Failures are dropped without closing the
/// channel: a bad frame is the server's bug, not a reason to disconnect.
fn handle_frame(text: &str, delivery_tx: &mpsc::UnboundedSender<Delivery>) {
    match serde_json::from_str::<WireNotification>(text) {
        Ok(item) => {
            debug!(event = "daemon.push.frame_delivered", id = ?item.id);
            let _ = delivery_tx.send(Delivery {
                mode: IngestMode::Append,
                items: vec![item],
            });
        }
        Err(e) => {
            warn!(event = "daemon.push.frame_decode_failed", error = %e);
        }
    }
}
