//! # ara-ipc - Cross-process ARA hosting
//!
//! Lets an ARA host drive a plug-in that runs in another process as if it
//! were loaded in-process.
//!
//! ## Architecture
//!
//! ara-ipc is an umbrella crate over:
//! - **ara-ipc-core** - Selectors, codec, handle tables, the reentrant connection, API traits
//! - **ara-ipc-host** - Host process side (plug-in proxies, callback dispatcher, factory bootstrap)
//! - **ara-ipc-plugin** - Plug-in process side (host interface proxies, call stub, socket server)
//!
//! ## Quick Start
//!
//! ```ignore
//! use ara_ipc::prelude::*;
//!
//! // Plug-in process
//! let server = PlugInServer::bind(&config, vec![factory])?;
//! server.run()?;
//!
//! // Host process
//! let session = HostSession::connect(&config)?;
//! let factories = RemoteFactories::bootstrap(&session)?;
//! let controller = factories.create_document_controller(0, interfaces, &properties)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Both process sides
//! - `host` - Host process side
//! - `plugin` - Plug-in process side

/// Re-export of ara-ipc-core for direct access
pub use ara_ipc_core as core;

// Core types
pub use ara_ipc_core::{
    AraBool, Connection, ContentEvent, ContentType, Dispatch, Handle, HandleTable, HostInterfacePresence,
    IpcConfig, IpcError, ObjectKind, RenderAccessGate, RenderGuard, Result, Selector,
};

// API traits and model types
pub use ara_ipc_core::{api, model, refs};

// Host process
#[cfg(feature = "host")]
pub use ara_ipc_host as host;

#[cfg(feature = "host")]
pub use ara_ipc_host::{
    ControllerState, DocumentControllerProxy, EditorRendererProxy, EditorViewProxy, HostSession,
    PlaybackRendererProxy, PlugInExtensionProxy, RemoteFactories,
};

// Plug-in process
#[cfg(feature = "plugin")]
pub use ara_ipc_plugin as plugin;

#[cfg(feature = "plugin")]
pub use ara_ipc_plugin::{PlugInServer, PlugInStub};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{ContentType, IpcConfig, IpcError, RenderAccessGate, Result};

    // Application traits
    pub use crate::api::{
        ArchivingController, AudioAccessController, ContentAccessController, DocumentController, EditorRenderer,
        EditorView, HostInterfaces, ModelUpdateController, PlaybackController, PlaybackRenderer, PlugInExtension,
        PlugInFactory, PlugInHostContext,
    };

    #[cfg(feature = "host")]
    pub use crate::{DocumentControllerProxy, HostSession, PlugInExtensionProxy, RemoteFactories};

    #[cfg(feature = "plugin")]
    pub use crate::{PlugInServer, PlugInStub};
}
