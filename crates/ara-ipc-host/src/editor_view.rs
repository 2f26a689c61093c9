//! Editor view proxy.

use ara_ipc_core::model::ViewSelection;
use ara_ipc_core::refs::{EditorViewRef, RegionSequenceRef};
use ara_ipc_core::{Connection, Result, Selector};
use std::sync::Arc;

#[derive(Clone)]
pub struct EditorViewProxy {
    connection: Arc<Connection>,
    remote: EditorViewRef,
}

impl EditorViewProxy {
    pub(crate) fn new(connection: Arc<Connection>, remote: EditorViewRef) -> Self {
        Self { connection, remote }
    }

    pub fn remote_ref(&self) -> EditorViewRef {
        self.remote
    }

    /// Tell the plug-in what the user selected in the host.
    pub fn notify_selection(&self, selection: &ViewSelection) -> Result<()> {
        self.connection
            .call(Selector::EditorViewNotifySelection, &(self.remote, selection))
    }

    /// Region sequences the host currently hides. An empty list shows all.
    pub fn notify_hide_region_sequences(&self, region_sequences: &[RegionSequenceRef]) -> Result<()> {
        self.connection.call(
            Selector::EditorViewNotifyHideRegionSequences,
            &(self.remote, region_sequences),
        )
    }
}
