//! Error types for the IPC layer

use crate::handle::ObjectKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Peer disconnected")]
    Disconnected,

    #[error("Frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown selector {0:#010x}")]
    UnknownSelector(u32),

    #[error("Stale or invalid {kind} handle {handle:#018x}")]
    StaleHandle { kind: ObjectKind, handle: u64 },

    #[error("Remote fault: {0}")]
    RemoteFault(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl IpcError {
    /// Transport failures and protocol mismatches end the session.
    ///
    /// Everything else is scoped to a single call and is answered with a fault.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IpcError::ConnectionFailed(_)
                | IpcError::Disconnected
                | IpcError::FrameTooLarge { .. }
                | IpcError::Protocol(_)
                | IpcError::UnknownSelector(_)
                | IpcError::Io(_)
                | IpcError::Serialization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;
