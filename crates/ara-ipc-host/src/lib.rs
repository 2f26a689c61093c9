//! Host process side of a cross-process ARA session
//!
//! This crate lets a host application drive an ARA plug-in that runs in
//! another process. The plug-in side is in `ara-ipc-plugin`.
//!
//! - [`RemoteFactories`] discovers the plug-in's factories and creates
//!   document controllers
//! - [`DocumentControllerProxy`] and the renderer/view proxies forward every
//!   call to the plug-in
//! - callbacks from the plug-in are routed to the [`HostInterfaces`] given for
//!   each controller
//!
//! ## Usage
//!
//! ```ignore
//! use ara_ipc_host::{HostSession, IpcConfig, RemoteFactories};
//!
//! let session = HostSession::connect(&IpcConfig::default())?;
//! let factories = RemoteFactories::bootstrap(&session)?;
//! let controller = factories.create_document_controller(0, interfaces, &properties)?;
//! controller.begin_editing()?;
//! ```

mod audio_source;
mod content_reader;
mod dispatcher;
mod document_controller;
mod editor_view;
mod factory;
mod plugin_extension;
mod renderers;
mod session;


pub use document_controller::{ControllerState, DocumentControllerProxy};
pub use editor_view::EditorViewProxy;
pub use factory::RemoteFactories;
pub use plugin_extension::PlugInExtensionProxy;
pub use renderers::{EditorRendererProxy, PlaybackRendererProxy};
pub use session::HostSession;

pub use ara_ipc_core::api::HostInterfaces;
pub use ara_ipc_core::{IpcConfig, IpcError, Result};
