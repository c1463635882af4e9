use std::path::PathBuf;

use taskpulse_core::Store;

/// Daemon runtime settings: where the control socket and durable state live.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl DaemonConfig {
    /// Default paths under the store root (`~/.taskpulse`).
    pub fn default_paths() -> Self {
        let data_dir = Store::default_root();
        Self {
            socket_path: data_dir.join("daemon.sock"),
            data_dir,
        }
    }
}
