//! taskpulse-daemon: the notification synchronization engine
//!
//! A single-writer service that owns the live notification set. It feeds
//! the ledger from one delivery transport (pull poller or push channel),
//! fires OS alerts for newly observed items, and answers a detached UI
//! over a Unix-socket control surface.

pub mod alerts;
pub mod client;
pub mod engine;
pub mod errors;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod types;

pub use client::{DaemonClient, RespondReply, StatusReport};
pub use errors::DaemonError;
pub use server::run_server;
pub use types::DaemonConfig;
