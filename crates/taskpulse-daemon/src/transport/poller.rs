//! Pull poller: fixed-interval fetch of the full pending set.
//!
//! Every tick is idempotent (the fetch returns the authoritative set), so
//! failures get no backoff escalation: the state flips to `Failed` and
//! the next tick retries at the same interval.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use taskpulse_core::{ApiClient, EngineConfig, IngestMode, TransportKind, TransportState};

use crate::transport::{Delivery, TransportHandle, transport_parts};

pub(crate) fn spawn(
    config: EngineConfig,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
) -> TransportHandle {
    let parts = transport_parts();
    let cancel = parts.cancel.clone();
    let task = tokio::spawn(run(config, delivery_tx, parts.state_tx, cancel.clone()));

    TransportHandle {
        kind: TransportKind::Poll,
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
    let api = ApiClient::new();
    let period = Duration::from_secs(config.poll_interval_secs.max(1));

    info!(
        event = "daemon.poller.started",
        server_url = %config.server_url,
        period_secs = period.as_secs(),
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            // The first tick fires immediately, giving the start-time fetch.
            // Once a tick is taken the fetch runs to completion: cancelling
            // mid-flight must not discard a result that is about to arrive.
            _ = ticker.tick() => {
                poll_once(&api, &config, &delivery_tx, &state_tx).await;
            }
        }
    }

    let _ = state_tx.send(TransportState::Idle);
    info!(event = "daemon.poller.stopped");
}

async fn poll_once(
    api: &ApiClient,
    config: &EngineConfig,
    delivery_tx: &mpsc::UnboundedSender<Delivery>,
    state_tx: &watch::Sender<TransportState>,
) {
    match api.fetch_notifications(config).await {
        Ok(items) => {
            debug!(event = "daemon.poller.fetch_completed", count = items.len());
            let _ = state_tx.send(TransportState::Active);
            let _ = delivery_tx.send(Delivery {
                mode: IngestMode::Replace,
                items,
            });
        }
        Err(e) => {
            // Self-heals on the next tick; surfaced only via the indicator.
            warn!(event = "daemon.poller.fetch_failed", error = %e);
            let _ = state_tx.send(TransportState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a fresh port, optionally delayed.
    async fn stub_server(body: &'static str, delay: Duration) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        port
    }

    fn config_for_port(port: u16) -> EngineConfig {
        EngineConfig {
            server_url: format!("http://127.0.0.1:{}", port),
            um_code: "UM001".to_string(),
            sound_enabled: true,
            transport: TransportKind::Poll,
            poll_interval_secs: 60,
        }
    }

    #[tokio::test]
    async fn test_successful_fetch_delivers_replace_batch() {
        let body = r#"{"code":0,"data":[{"id":1,"title":"t","content":"c","task_id":9,"timestamp":"2026-03-01T09:00:00Z"}]}"#;
        let port = stub_server(body, Duration::ZERO).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn(config_for_port(port), tx);

        let delivery = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("poller should deliver")
            .unwrap();
        assert_eq!(delivery.mode, IngestMode::Replace);
        assert_eq!(delivery.items.len(), 1);
        assert_eq!(handle.state(), TransportState::Active);

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_in_flight_poll_survives_stop() {
        // Stopping cancels the timer, not a fetch already on the wire: the
        // result that arrives afterwards is still delivered.
        let body = r#"{"code":0,"data":[{"id":2,"title":"t","content":"c","timestamp":"2026-03-01T09:00:00Z"}]}"#;
        let port = stub_server(body, Duration::from_millis(300)).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn(config_for_port(port), tx);

        // Let the first fetch get on the wire, then stop mid-flight.
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .expect("stop should wait out the in-flight poll");

        let delivery = rx.try_recv().expect("in-flight result must be applied");
        assert_eq!(delivery.mode, IngestMode::Replace);
        assert_eq!(delivery.items.len(), 1);
    }

    fn unreachable_config() -> EngineConfig {
        EngineConfig {
            // Nothing listens on port 1; the fetch fails fast.
            server_url: "http://127.0.0.1:1".to_string(),
            um_code: "UM001".to_string(),
            sound_enabled: true,
            transport: TransportKind::Poll,
            poll_interval_secs: 60,
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_sets_failed_state_and_keeps_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn(unreachable_config(), tx);

        let mut states = handle.state_receiver();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if *states.borrow_and_update() == TransportState::Failed {
                    break;
                }
                states.changed().await.unwrap();
            }
        })
        .await
        .expect("poller should reach Failed");

        // No delivery was produced for the failed cycle.
        assert!(rx.try_recv().is_err());

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_prompt_and_leaves_idle_state() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = spawn(unreachable_config(), tx);
        let states = handle.state_receiver();

        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .expect("stop should not hang");
        assert_eq!(*states.borrow(), TransportState::Idle);
    }
}
