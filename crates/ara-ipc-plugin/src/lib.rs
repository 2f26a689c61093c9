//! Plug-in process side of a cross-process ARA session
//!
//! The real plug-in implements the [`ara_ipc_core::api`] plug-in traits.
//! [`PlugInStub`] receives host calls, validates every ref they carry and
//! forwards them. The host interfaces the plug-in sees are proxies that turn
//! each callback into a message back to the host process.
//!
//! ## Usage
//!
//! ```ignore
//! use ara_ipc_plugin::PlugInServer;
//!
//! let server = PlugInServer::bind(&config, vec![my_factory])?;
//! server.run()?;
//! ```

mod archiving;
mod audio_access;
mod content_access;
mod host_link;
mod notifications;
mod registry;
mod server;
mod stub;

#[cfg(test)]
mod test_support;

pub use archiving::ArchivingProxy;
pub use audio_access::AudioAccessProxy;
pub use content_access::ContentAccessProxy;
pub use notifications::{ModelUpdateProxy, PlaybackControllerProxy};
pub use registry::LiveRegistry;
pub use server::PlugInServer;
pub use stub::PlugInStub;

pub use ara_ipc_core::{IpcConfig, IpcError, Result};
