//! Application-facing interfaces.
//!
//! [`host`] holds what the host application implements and the plug-in calls;
//! [`plugin`] holds what the plug-in implements and the host calls. Each side
//! of a session implements the other side's traits with proxies.

pub mod host;
pub mod plugin;

pub use host::{
    ArchivingController, AudioAccessController, ContentAccessController, HostInterfaces,
    ModelUpdateController, PlaybackController,
};
pub use plugin::{
    BoundRoles, DocumentController, EditorRenderer, EditorView, PlaybackRenderer,
    PlugInExtension, PlugInFactory, PlugInHostContext,
};
