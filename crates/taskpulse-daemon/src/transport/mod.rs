//! Delivery transports feeding the engine.
//!
//! Two interchangeable strategies behind one handle: the pull poller
//! (fixed-interval HTTP fetch, replace-mode deliveries) and the push
//! channel (websocket, append-mode deliveries). Exactly one runs at a
//! time; the engine stops the old one before starting a new one so the
//! ledger never sees duplicate delivery streams.

pub mod poller;
pub mod push;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use taskpulse_core::{EngineConfig, IngestMode, TransportKind, TransportState, WireNotification};

/// One batch of notifications handed to the engine, tagged with how the
/// ledger should fold it in.
#[derive(Debug)]
pub struct Delivery {
    pub mode: IngestMode,
    pub items: Vec<WireNotification>,
}

/// Handle to a running transport task.
///
/// Dropping the handle without calling [`stop`](TransportHandle::stop)
/// leaves the task running; the engine always stops explicitly.
pub struct TransportHandle {
    kind: TransportKind,
    state_rx: watch::Receiver<TransportState>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl TransportHandle {
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Current transport state (read-only; the transport is the sole writer).
    pub fn state(&self) -> TransportState {
        self.state_rx.borrow().clone()
    }

    /// Watch-side receiver for callers that need to await state changes.
    pub fn state_receiver(&self) -> watch::Receiver<TransportState> {
        self.state_rx.clone()
    }

    /// Stop the transport and wait for its task to finish.
    ///
    /// Cancellation is observed between cycles: a poll already in flight
    /// completes and its result is still delivered, but no further timer
    /// tick or reconnect fires after this returns.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(event = "daemon.transport.stop_join_failed", error = %e);
        }
        info!(event = "daemon.transport.stopped", kind = %self.kind);
    }
}

/// Spawn the transport selected by the configuration.
///
/// Callers must ensure the configuration is complete; an incomplete config
/// means no transport at all, decided one level up.
pub fn spawn(
    config: &EngineConfig,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
) -> TransportHandle {
    match config.transport {
        TransportKind::Poll => poller::spawn(config.clone(), delivery_tx),
        TransportKind::Push => push::spawn(config.clone(), delivery_tx),
    }
}

pub(crate) struct TransportParts {
    pub state_tx: watch::Sender<TransportState>,
    pub state_rx: watch::Receiver<TransportState>,
    pub cancel: CancellationToken,
}

pub(crate) fn transport_parts() -> TransportParts {
    let (state_tx, state_rx) = watch::channel(TransportState::Connecting);
    TransportParts {
        state_tx,
        state_rx,
        cancel: CancellationToken::new(),
    }
}
