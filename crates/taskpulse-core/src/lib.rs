//! taskpulse-core: Core library for the TaskPulse notification engine
//!
//! This library provides the domain logic shared by the daemon and the CLI:
//! the notification ledger, engine configuration, durable store, status
//! projection, and the task server API client.
//!
//! # Main Entry Points
//!
//! - [`ledger`] - Deduplication, bounded history, read tracking
//! - [`config`] - Engine configuration record
//! - [`store`] - Durable config/history persistence
//! - [`status`] - Transport state and the derived indicator
//! - [`api`] - Task server REST client

pub mod api;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod logging;
pub mod status;
pub mod store;

// Re-export commonly used types at crate root for convenience
pub use api::{ApiClient, ApiError, ws_endpoint};
pub use config::{EngineConfig, TransportKind};
pub use errors::{PulseError, PulseResult};
pub use ledger::{HISTORY_CAP, IngestMode, Ledger, Notification, NotificationId, WireNotification};
pub use status::{StatusIndicator, TransportState, project};
pub use store::{Store, StoreError};

// Re-export logging initialization
pub use logging::init_logging;
