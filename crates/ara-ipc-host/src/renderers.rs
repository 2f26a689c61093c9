//! Playback and editor renderer proxies.

use ara_ipc_core::refs::{EditorRendererRef, PlaybackRegionRef, PlaybackRendererRef, RegionSequenceRef};
use ara_ipc_core::{Connection, Result, Selector};
use std::sync::Arc;

/// Renderer role of a bound plug-in instance.
#[derive(Clone)]
pub struct PlaybackRendererProxy {
    connection: Arc<Connection>,
    remote: PlaybackRendererRef,
}

impl PlaybackRendererProxy {
    pub(crate) fn new(connection: Arc<Connection>, remote: PlaybackRendererRef) -> Self {
        Self { connection, remote }
    }

    pub fn remote_ref(&self) -> PlaybackRendererRef {
        self.remote
    }

    pub fn add_playback_region(&self, playback_region: PlaybackRegionRef) -> Result<()> {
        self.connection.call(
            Selector::PlaybackRendererAddPlaybackRegion,
            &(self.remote, playback_region),
        )
    }

    pub fn remove_playback_region(&self, playback_region: PlaybackRegionRef) -> Result<()> {
        self.connection.call(
            Selector::PlaybackRendererRemovePlaybackRegion,
            &(self.remote, playback_region),
        )
    }
}

/// Editor renderer role: previews edits of regions not in the playback graph.
#[derive(Clone)]
pub struct EditorRendererProxy {
    connection: Arc<Connection>,
    remote: EditorRendererRef,
}

impl EditorRendererProxy {
    pub(crate) fn new(connection: Arc<Connection>, remote: EditorRendererRef) -> Self {
        Self { connection, remote }
    }

    pub fn remote_ref(&self) -> EditorRendererRef {
        self.remote
    }

    pub fn add_playback_region(&self, playback_region: PlaybackRegionRef) -> Result<()> {
        self.connection.call(
            Selector::EditorRendererAddPlaybackRegion,
            &(self.remote, playback_region),
        )
    }

    pub fn remove_playback_region(&self, playback_region: PlaybackRegionRef) -> Result<()> {
        self.connection.call(
            Selector::EditorRendererRemovePlaybackRegion,
            &(self.remote, playback_region),
        )
    }

    pub fn add_region_sequence(&self, region_sequence: RegionSequenceRef) -> Result<()> {
        self.connection.call(
            Selector::EditorRendererAddRegionSequence,
            &(self.remote, region_sequence),
        )
    }

    pub fn remove_region_sequence(&self, region_sequence: RegionSequenceRef) -> Result<()> {
        self.connection.call(
            Selector::EditorRendererRemoveRegionSequence,
            &(self.remote, region_sequence),
        )
    }
}
