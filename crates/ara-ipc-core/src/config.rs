//! Connection configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by both ends of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Unix socket path, or pipe name on Windows.
    pub socket_path: PathBuf,
    /// Largest frame either side accepts, in bytes.
    pub max_frame_size: usize,
    pub connect_timeout_ms: u64,
    pub connect_retry_interval_ms: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: std::env::temp_dir().join("ara-ipc.sock"),
            max_frame_size: 64 * 1024 * 1024,
            connect_timeout_ms: 5000,
            connect_retry_interval_ms: 50,
        }
    }
}

impl IpcConfig {
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn connect_retry_interval(&self) -> Duration {
        Duration::from_millis(self.connect_retry_interval_ms.max(1))
    }
}
