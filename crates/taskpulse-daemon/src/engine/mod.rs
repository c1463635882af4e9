//! The notification engine.
//!
//! One engine instance per process owns every piece of mutable state:
//! configuration, ledger, the active transport handle, and the alert
//! click registry. The server wraps it in `Arc<Mutex<_>>`, so all ledger
//! access is serialized; transport deliveries and control-surface
//! requests never interleave mid-mutation.

use tokio::sync::mpsc;
use tracing::{info, warn};

use taskpulse_core::{
    ApiClient, EngineConfig, IngestMode, Ledger, Notification, NotificationId, StatusIndicator,
    Store, StoreError, TransportState, project,
};

use crate::alerts::AlertDispatcher;
use crate::transport::{self, Delivery, TransportHandle};

/// Result of a respond action, shaped for the control surface: failures
/// are data, never an exception across the boundary.
#[derive(Debug)]
pub struct RespondOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub task_url: Option<String>,
}

pub struct Engine {
    config: EngineConfig,
    ledger: Ledger,
    store: Store,
    api: ApiClient,
    alerts: AlertDispatcher,
    transport: Option<TransportHandle>,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
}

impl Engine {
    /// Build an engine from durable state.
    ///
    /// Loads the persisted configuration and notification history before
    /// any transport starts, so a restart resumes where the process left
    /// off. `delivery_tx` is the channel transports feed; the server pumps
    /// its receiving end back into [`ingest`](Engine::ingest).
    pub fn init(
        store: Store,
        alerts: AlertDispatcher,
        delivery_tx: mpsc::UnboundedSender<Delivery>,
    ) -> Self {
        let config = match store.load_config() {
            Ok(Some(config)) => config,
            Ok(None) => EngineConfig::default(),
            Err(e) => {
                warn!(event = "daemon.engine.config_load_failed", error = %e);
                EngineConfig::default()
            }
        };

        let history = match store.load_history() {
            Ok(items) => items,
            Err(e) => {
                warn!(event = "daemon.engine.history_load_failed", error = %e);
                Vec::new()
            }
        };

        info!(
            event = "daemon.engine.init_completed",
            configured = config.is_complete(),
            history_len = history.len(),
        );

        Self {
            config,
            ledger: Ledger::from_items(history),
            store,
            api: ApiClient::new(),
            alerts,
            transport: None,
            delivery_tx,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start the configured transport if none is running.
    ///
    /// Incomplete configuration suppresses transport activity entirely;
    /// the engine then waits for an explicit config update.
    pub fn start_transport(&mut self) {
        if self.transport.is_some() {
            return;
        }
        if !self.config.is_complete() {
            info!(event = "daemon.engine.inactive", reason = "config_incomplete");
            return;
        }
        info!(
            event = "daemon.engine.transport_starting",
            kind = %self.config.transport,
        );
        self.transport = Some(transport::spawn(&self.config, self.delivery_tx.clone()));
    }

    /// Stop the active transport, if any. Idempotent.
    pub async fn stop_transport(&mut self) {
        if let Some(handle) = self.transport.take() {
            handle.stop().await;
        }
    }

    /// Persist a new configuration and restart the transport under it.
    ///
    /// The old transport is fully stopped before the new one starts so the
    /// ledger never receives from two transports at once. A delivery the
    /// old transport already has in flight still lands in the channel and
    /// is applied normally.
    pub async fn apply_config(&mut self, config: EngineConfig) -> Result<(), StoreError> {
        self.store.save_config(&config)?;
        info!(
            event = "daemon.engine.config_updated",
            configured = config.is_complete(),
            transport = %config.transport,
        );
        self.config = config;
        self.stop_transport().await;
        self.start_transport();
        Ok(())
    }

    /// Fold a delivery into the ledger, persist, and alert for new items.
    pub fn ingest(&mut self, delivery: Delivery) {
        let newly_arrived = self.ledger.ingest(delivery.items, delivery.mode);

        if let Err(e) = self.store.save_history(self.ledger.snapshot()) {
            // State survives in memory; the next mutation retries the write.
            warn!(event = "daemon.engine.history_persist_failed", error = %e);
        }

        for notification in &newly_arrived {
            self.alerts.dispatch(&self.config, notification);
        }
    }

    /// Mark a notification read and persist the change.
    pub fn mark_read(&mut self, id: &NotificationId) {
        if self.ledger.mark_read(id) {
            if let Err(e) = self.store.save_history(self.ledger.snapshot()) {
                warn!(event = "daemon.engine.history_persist_failed", error = %e);
            }
        }
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.ledger.snapshot().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        self.ledger.unread_count()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport
            .as_ref()
            .map(|t| t.state())
            .unwrap_or(TransportState::Idle)
    }

    pub fn indicator(&self) -> StatusIndicator {
        project(&self.transport_state(), self.ledger.unread_count())
    }

    /// Respond to a task, then re-sync the ledger out of band.
    ///
    /// The re-sync is one extra pull/Replace cycle so the ledger reflects
    /// the action without waiting for the next scheduled delivery; its
    /// failure does not fail the respond (the next cycle catches up).
    pub async fn respond_task(&mut self, task_id: i64) -> RespondOutcome {
        if !self.config.is_complete() {
            return RespondOutcome {
                success: false,
                error: Some("engine is not configured".to_string()),
                task_url: None,
            };
        }

        if let Err(e) = self.api.respond_task(&self.config, task_id).await {
            info!(event = "daemon.engine.respond_failed", task_id = task_id, error = %e);
            return RespondOutcome {
                success: false,
                error: Some(e.to_string()),
                task_url: None,
            };
        }

        match self.api.fetch_notifications(&self.config).await {
            Ok(items) => self.ingest(Delivery {
                mode: IngestMode::Replace,
                items,
            }),
            Err(e) => {
                warn!(event = "daemon.engine.resync_failed", error = %e);
            }
        }

        info!(event = "daemon.engine.respond_completed", task_id = task_id);
        RespondOutcome {
            success: true,
            error: None,
            task_url: Some(self.config.task_url(task_id)),
        }
    }

    /// Stop the transport and release the engine.
    pub async fn shutdown(&mut self) {
        self.stop_transport().await;
        info!(event = "daemon.engine.shutdown_completed");
    }
}
