//! Control-surface server over a Unix domain socket.

pub mod connection;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use taskpulse_core::Store;

use crate::alerts::{AlertDispatcher, PlatformAlertSink};
use crate::engine::Engine;
use crate::errors::DaemonError;
use crate::types::DaemonConfig;

/// Run the daemon until a stop request or Ctrl-C.
///
/// Binds the control socket, restores durable state, starts the configured
/// transport, and serves control-surface connections. Deliveries from the
/// transport are pumped into the engine on a dedicated task; each client
/// connection gets its own handler task.
pub async fn run_server(config: DaemonConfig) -> Result<(), DaemonError> {
    fs::create_dir_all(&config.data_dir)?;
    let _ = fs::set_permissions(&config.data_dir, fs::Permissions::from_mode(0o700));

    if config.socket_path.exists() {
        let _ = fs::remove_file(&config.socket_path);
    }
    let listener = UnixListener::bind(&config.socket_path)?;
    let _ = fs::set_permissions(&config.socket_path, fs::Permissions::from_mode(0o600));

    let store = Store::new(config.data_dir.clone());
    let alerts = AlertDispatcher::new(Box::new(PlatformAlertSink));
    let (delivery_tx, mut delivery_rx) = mpsc::unbounded_channel();

    let engine = {
        let mut engine = Engine::init(store, alerts, delivery_tx);
        engine.start_transport();
        Arc::new(Mutex::new(engine))
    };

    let shutdown = CancellationToken::new();

    // Delivery pump: the single writer path from transports to the ledger.
    let pump_engine = engine.clone();
    let pump_shutdown = shutdown.clone();
    let pump = tokio::spawn(async move {
        loop {
            tokio::select! {
                delivery = delivery_rx.recv() => {
                    match delivery {
                        Some(delivery) => pump_engine.lock().await.ingest(delivery),
                        None => break,
                    }
                }
                _ = pump_shutdown.cancelled() => break,
            }
        }
    });

    // Ctrl-C folds into the same shutdown path as DAEMON_STOP.
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(event = "daemon.server.interrupted");
            signal_shutdown.cancel();
        }
    });

    info!(
        event = "daemon.server.started",
        socket = %config.socket_path.display(),
        data_dir = %config.data_dir.display(),
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accept = listener.accept() => {
                match accept {
                    Ok((stream, _addr)) => {
                        let engine = engine.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            connection::handle_connection(stream, engine, shutdown).await;
                        });
                    }
                    Err(e) => {
                        warn!(event = "daemon.server.accept_error", error = %e);
                    }
                }
            }
        }
    }

    engine.lock().await.shutdown().await;
    if let Err(e) = pump.await {
        warn!(event = "daemon.server.pump_join_failed", error = %e);
    }
    let _ = fs::remove_file(&config.socket_path);
    info!(event = "daemon.server.stopped");

    Ok(())
}
