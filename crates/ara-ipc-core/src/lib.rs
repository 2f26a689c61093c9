//! Shared protocol for cross-process ARA hosting
//!
//! Both processes of a session link this crate: the host side through
//! `ara-ipc-host`, the plug-in side through `ara-ipc-plugin`. It defines what
//! travels between them and how:
//!
//! - **Selectors** ([`protocol`]): one fixed id per remotely callable operation
//! - **Codec** ([`codec`], [`content`]): argument tuples and content events
//! - **Handles** ([`handle`]): generational tables that validate every ref the
//!   peer hands back
//! - **Connection** ([`connection`]): blocking request/reply with reentrant
//!   dispatch over a [`transport`]
//!
//! ## Usage
//!
//! ```ignore
//! use ara_ipc_core::{Connection, IpcConfig, SocketTransport};
//!
//! let transport = SocketTransport::connect(&IpcConfig::default())?;
//! let connection = Connection::from_socket(transport);
//! ```

pub mod api;
pub mod codec;
pub mod config;
pub mod connection;
pub mod content;
pub mod error;
pub mod gate;
pub mod handle;
pub mod model;
pub mod protocol;
pub mod refs;
pub mod transport;

pub use codec::AraBool;
pub use config::IpcConfig;
pub use connection::{Connection, Dispatch};
pub use content::{ContentEvent, ContentType};
pub use error::{IpcError, Result};
pub use gate::{RenderAccessGate, RenderGuard};
pub use handle::{Handle, HandleTable, ObjectKind};
pub use protocol::{ExtensionBinding, HostInterfacePresence, Interface, Selector};
pub use transport::{Frame, FrameKind, FrameReceiver, FrameSender, SocketTransport, TransportListener};
