//! Plug-in extension proxy.
//!
//! Binding a plug-in instance to a document controller keeps that controller
//! alive on the host side until the binding is torn down, even if the
//! controller is destroyed first.

use crate::document_controller::DocumentControllerProxy;
use crate::editor_view::EditorViewProxy;
use crate::renderers::{EditorRendererProxy, PlaybackRendererProxy};
use ara_ipc_core::model::PlugInRoles;
use ara_ipc_core::refs::PlugInExtensionRef;
use ara_ipc_core::{ExtensionBinding, Result, Selector};
use tracing::{debug, warn};

pub struct PlugInExtensionProxy {
    controller: DocumentControllerProxy,
    remote: PlugInExtensionRef,
    playback_renderer: Option<PlaybackRendererProxy>,
    editor_renderer: Option<EditorRendererProxy>,
    editor_view: Option<EditorViewProxy>,
    torn_down: bool,
}

impl PlugInExtensionProxy {
    /// Bind the plug-in instance behind `extension` to `controller`.
    pub fn bind(
        controller: &DocumentControllerProxy,
        extension: PlugInExtensionRef,
        known_roles: PlugInRoles,
        assigned_roles: PlugInRoles,
    ) -> Result<Self> {
        let remote_controller = controller.remote()?;
        controller.shared.acquire_extension()?;

        let bound: Result<ExtensionBinding> = controller.call(
            Selector::BindToDocumentController,
            &(extension, remote_controller, known_roles, assigned_roles),
        );
        let binding = match bound {
            Ok(binding) => binding,
            Err(e) => {
                controller.shared.release_extension();
                return Err(e);
            }
        };
        debug!(
            extension = extension.bits(),
            controller = remote_controller.bits(),
            "plug-in extension bound"
        );

        let connection = controller.shared.connection.clone();
        Ok(Self {
            controller: controller.clone(),
            remote: extension,
            playback_renderer: binding
                .playback_renderer
                .map(|r| PlaybackRendererProxy::new(connection.clone(), r)),
            editor_renderer: binding
                .editor_renderer
                .map(|r| EditorRendererProxy::new(connection.clone(), r)),
            editor_view: binding
                .editor_view
                .map(|r| EditorViewProxy::new(connection.clone(), r)),
            torn_down: false,
        })
    }

    pub fn remote_ref(&self) -> PlugInExtensionRef {
        self.remote
    }

    pub fn document_controller(&self) -> &DocumentControllerProxy {
        &self.controller
    }

    pub fn playback_renderer(&self) -> Option<&PlaybackRendererProxy> {
        self.playback_renderer.as_ref()
    }

    pub fn editor_renderer(&self) -> Option<&EditorRendererProxy> {
        self.editor_renderer.as_ref()
    }

    pub fn editor_view(&self) -> Option<&EditorViewProxy> {
        self.editor_view.as_ref()
    }

    /// Tear down the binding, then let the controller finalize if it was
    /// waiting for this extension.
    pub fn destroy(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        self.playback_renderer = None;
        self.editor_renderer = None;
        self.editor_view = None;

        let sent = self
            .controller
            .shared
            .connection
            .notify(Selector::DestroyPlugInExtension, &self.remote);
        self.controller.shared.release_extension();
        debug!(extension = self.remote.bits(), "plug-in extension destroyed");
        sent
    }
}

impl Drop for PlugInExtensionProxy {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(extension = self.remote.bits(), error = %e, "plug-in extension teardown failed");
        }
    }
}
