//! Document controller proxy.
//!
//! Destruction is deferred: [`DocumentControllerProxy::destroy`] only moves the
//! controller to `PendingDestruction`, and local storage is released once no
//! plug-in extension references the controller any more. Both triggers run
//! [`DocumentControllerProxy::finalize_if_unreferenced`], which frees exactly
//! once.

use crate::audio_source::AudioSourceProxy;
use crate::content_reader::ContentReaderProxy;
use crate::dispatcher::{HostAudioReader, HostContentReader};
use crate::session::{HostSession, SessionState};
use ara_ipc_core::api::HostInterfaces;
use ara_ipc_core::model::{
    AudioModificationProperties, ContentTimeRange, ContentUpdateFlags, DocumentProperties,
    MusicalContextProperties, PlaybackRegionHeadAndTailTime, PlaybackRegionProperties,
    ProcessingAlgorithmProperties, RegionSequenceProperties, RestoreObjectsFilter,
};
use ara_ipc_core::refs::{
    ArchiveReaderHostRef, AudioModificationHostRef, AudioModificationRef, DocumentControllerHostRef,
    DocumentControllerRef, MusicalContextHostRef, MusicalContextRef, PlaybackRegionHostRef,
    PlaybackRegionRef, RegionSequenceHostRef, RegionSequenceRef,
};
use ara_ipc_core::{AraBool, Connection, HandleTable, IpcError, ObjectKind, Result, Selector};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, OnceLock, Weak};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Live,
    /// Destroy was requested; extensions still hold the controller.
    PendingDestruction,
    Gone,
}

struct Lifecycle {
    state: ControllerState,
    extensions: usize,
}

/// Per-controller tables of objects addressed by handle.
pub(crate) struct ControllerObjects {
    pub(crate) audio_sources: HandleTable<AudioSourceProxy>,
    pub(crate) content_readers: HandleTable<ContentReaderProxy>,
    pub(crate) audio_readers: HandleTable<HostAudioReader>,
    pub(crate) host_content_readers: HandleTable<HostContentReader>,
}

impl ControllerObjects {
    fn new() -> Self {
        Self {
            audio_sources: HandleTable::new(ObjectKind::AudioSource),
            content_readers: HandleTable::new(ObjectKind::ContentReader),
            audio_readers: HandleTable::new(ObjectKind::AudioReader),
            host_content_readers: HandleTable::new(ObjectKind::HostContentReader),
        }
    }

    fn clear(&mut self) {
        self.audio_sources.drain();
        self.content_readers.drain();
        self.audio_readers.drain();
        self.host_content_readers.drain();
    }
}

pub(crate) struct ControllerShared {
    remote: OnceLock<DocumentControllerRef>,
    host_ref: OnceLock<DocumentControllerHostRef>,
    pub(crate) interfaces: HostInterfaces,
    pub(crate) connection: Arc<Connection>,
    session: Weak<SessionState>,
    lifecycle: Mutex<Lifecycle>,
    pub(crate) objects: Mutex<ControllerObjects>,
}

impl ControllerShared {
    pub(crate) fn state(&self) -> ControllerState {
        self.lifecycle.lock().state
    }

    pub(crate) fn is_gone(&self) -> bool {
        self.state() == ControllerState::Gone
    }

    pub(crate) fn remote(&self) -> Result<DocumentControllerRef> {
        if self.is_gone() {
            return Err(IpcError::InvalidState("document controller is gone".into()));
        }
        self.remote
            .get()
            .copied()
            .ok_or_else(|| IpcError::InvalidState("document controller not created".into()))
    }

    pub(crate) fn host_ref(&self) -> DocumentControllerHostRef {
        self.host_ref.get().copied().unwrap_or_default()
    }

    pub(crate) fn acquire_extension(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != ControllerState::Live {
            return Err(IpcError::InvalidState(format!(
                "cannot bind an extension to a {:?} document controller",
                lifecycle.state
            )));
        }
        lifecycle.extensions += 1;
        Ok(())
    }

    pub(crate) fn release_extension(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.extensions = lifecycle.extensions.saturating_sub(1);
        }
        self.finalize_if_unreferenced();
    }

    pub(crate) fn extension_count(&self) -> usize {
        self.lifecycle.lock().extensions
    }

    pub(crate) fn finalize_if_unreferenced(&self) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != ControllerState::PendingDestruction || lifecycle.extensions > 0 {
                return false;
            }
            lifecycle.state = ControllerState::Gone;
        }

        if let (Some(session), Some(host_ref)) = (self.session.upgrade(), self.host_ref.get()) {
            let removed = session.controllers.lock().take(host_ref.bits()).ok();
            drop(removed);
        }
        self.objects.lock().clear();
        debug!(host_ref = self.host_ref().bits(), "document controller finalized");
        true
    }

    /// Session teardown: drop everything without notifying the peer.
    pub(crate) fn mark_gone(&self) {
        self.lifecycle.lock().state = ControllerState::Gone;
        self.objects.lock().clear();
    }
}

/// Host-side stand-in for a plug-in document controller.
///
/// Every method is one blocking round trip unless noted. Audio source and
/// content reader refs handed out by this proxy are local handles; they are
/// translated to the plug-in's refs before sending.
#[derive(Clone)]
pub struct DocumentControllerProxy {
    pub(crate) shared: Arc<ControllerShared>,
}

impl std::fmt::Debug for DocumentControllerProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentControllerProxy")
            .field("remote", &self.shared.remote.get())
            .field("host_ref", &self.shared.host_ref())
            .field("state", &self.shared.state())
            .finish()
    }
}

impl DocumentControllerProxy {
    /// Create the remote controller and register this proxy for callbacks in
    /// one round trip.
    pub(crate) fn create(
        session: &HostSession,
        factory_index: u32,
        interfaces: HostInterfaces,
        properties: &DocumentProperties,
    ) -> Result<Self> {
        let presence = interfaces.presence();
        let shared = Arc::new(ControllerShared {
            remote: OnceLock::new(),
            host_ref: OnceLock::new(),
            interfaces,
            connection: session.connection().clone(),
            session: Arc::downgrade(&session.state),
            lifecycle: Mutex::new(Lifecycle {
                state: ControllerState::Live,
                extensions: 0,
            }),
            objects: Mutex::new(ControllerObjects::new()),
        });

        let handle = session.state.controllers.lock().insert(shared.clone());
        let host_ref = DocumentControllerHostRef(handle.to_bits());
        let _ = shared.host_ref.set(host_ref);

        let created: Result<DocumentControllerRef> = session.connection().call(
            Selector::CreateDocumentController,
            &(factory_index, host_ref, presence, properties),
        );
        match created {
            Ok(remote) => {
                let _ = shared.remote.set(remote);
                debug!(remote = remote.bits(), host_ref = host_ref.bits(), "document controller created");
                Ok(Self { shared })
            }
            Err(e) => {
                session.state.controllers.lock().remove(handle);
                Err(e)
            }
        }
    }

    pub(crate) fn call<A, R>(&self, selector: Selector, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.shared.connection.call(selector, args)
    }

    pub(crate) fn remote(&self) -> Result<DocumentControllerRef> {
        self.shared.remote()
    }

    /// The plug-in's ref for this controller.
    pub fn remote_ref(&self) -> Result<DocumentControllerRef> {
        self.remote()
    }

    /// The ref the plug-in uses to route callbacks to this controller.
    pub fn host_ref(&self) -> DocumentControllerHostRef {
        self.shared.host_ref()
    }

    pub fn state(&self) -> ControllerState {
        self.shared.state()
    }

    pub fn extension_count(&self) -> usize {
        self.shared.extension_count()
    }

    pub fn interfaces(&self) -> &HostInterfaces {
        &self.shared.interfaces
    }

    /// Request destruction (one-way). Storage is released once no extension
    /// references the controller.
    pub fn destroy(&self) -> Result<()> {
        let remote = self.remote()?;
        {
            let mut lifecycle = self.shared.lifecycle.lock();
            if lifecycle.state != ControllerState::Live {
                return Err(IpcError::InvalidState("document controller already destroyed".into()));
            }
            lifecycle.state = ControllerState::PendingDestruction;
        }
        debug!(remote = remote.bits(), "destroying document controller");
        let sent = self
            .shared
            .connection
            .notify(Selector::DestroyDocumentController, &remote);
        self.finalize_if_unreferenced();
        sent
    }

    /// Free local storage if destruction was requested and nothing references
    /// the controller. Returns whether this call did the freeing.
    pub fn finalize_if_unreferenced(&self) -> bool {
        self.shared.finalize_if_unreferenced()
    }

    // ========================================================================
    // Document
    // ========================================================================

    pub fn begin_editing(&self) -> Result<()> {
        self.call(Selector::BeginEditing, &self.remote()?)
    }

    pub fn end_editing(&self) -> Result<()> {
        self.call(Selector::EndEditing, &self.remote()?)
    }

    pub fn notify_model_updates(&self) -> Result<()> {
        self.call(Selector::NotifyModelUpdates, &self.remote()?)
    }

    pub fn restore_objects_from_archive(
        &self,
        reader: ArchiveReaderHostRef,
        filter: Option<&RestoreObjectsFilter>,
    ) -> Result<bool> {
        let restored: AraBool = self.call(
            Selector::RestoreObjectsFromArchive,
            &(self.remote()?, reader, filter),
        )?;
        Ok(restored.into())
    }

    pub fn update_document_properties(&self, properties: &DocumentProperties) -> Result<()> {
        self.call(Selector::UpdateDocumentProperties, &(self.remote()?, properties))
    }

    // ========================================================================
    // Musical contexts and region sequences
    // ========================================================================

    pub fn create_musical_context(
        &self,
        host_ref: MusicalContextHostRef,
        properties: &MusicalContextProperties,
    ) -> Result<MusicalContextRef> {
        self.call(Selector::CreateMusicalContext, &(self.remote()?, host_ref, properties))
    }

    pub fn update_musical_context_properties(
        &self,
        musical_context: MusicalContextRef,
        properties: &MusicalContextProperties,
    ) -> Result<()> {
        self.call(
            Selector::UpdateMusicalContextProperties,
            &(self.remote()?, musical_context, properties),
        )
    }

    pub fn update_musical_context_content(
        &self,
        musical_context: MusicalContextRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    ) -> Result<()> {
        self.call(
            Selector::UpdateMusicalContextContent,
            &(self.remote()?, musical_context, range, flags),
        )
    }

    pub fn destroy_musical_context(&self, musical_context: MusicalContextRef) -> Result<()> {
        self.call(Selector::DestroyMusicalContext, &(self.remote()?, musical_context))
    }

    pub fn create_region_sequence(
        &self,
        host_ref: RegionSequenceHostRef,
        properties: &RegionSequenceProperties,
    ) -> Result<RegionSequenceRef> {
        self.call(Selector::CreateRegionSequence, &(self.remote()?, host_ref, properties))
    }

    pub fn update_region_sequence_properties(
        &self,
        region_sequence: RegionSequenceRef,
        properties: &RegionSequenceProperties,
    ) -> Result<()> {
        self.call(
            Selector::UpdateRegionSequenceProperties,
            &(self.remote()?, region_sequence, properties),
        )
    }

    pub fn destroy_region_sequence(&self, region_sequence: RegionSequenceRef) -> Result<()> {
        self.call(Selector::DestroyRegionSequence, &(self.remote()?, region_sequence))
    }

    // ========================================================================
    // Audio modifications and playback regions
    // ========================================================================

    pub fn clone_audio_modification(
        &self,
        source: AudioModificationRef,
        host_ref: AudioModificationHostRef,
        properties: &AudioModificationProperties,
    ) -> Result<AudioModificationRef> {
        self.call(
            Selector::CloneAudioModification,
            &(self.remote()?, source, host_ref, properties),
        )
    }

    pub fn update_audio_modification_properties(
        &self,
        audio_modification: AudioModificationRef,
        properties: &AudioModificationProperties,
    ) -> Result<()> {
        self.call(
            Selector::UpdateAudioModificationProperties,
            &(self.remote()?, audio_modification, properties),
        )
    }

    pub fn is_audio_modification_preserving_audio_source_signal(
        &self,
        audio_modification: AudioModificationRef,
    ) -> Result<bool> {
        let preserving: AraBool = self.call(
            Selector::IsAudioModificationPreservingAudioSourceSignal,
            &(self.remote()?, audio_modification),
        )?;
        Ok(preserving.into())
    }

    pub fn deactivate_audio_modification_for_undo_history(
        &self,
        audio_modification: AudioModificationRef,
        deactivate: bool,
    ) -> Result<()> {
        self.call(
            Selector::DeactivateAudioModificationForUndoHistory,
            &(self.remote()?, audio_modification, AraBool(deactivate)),
        )
    }

    pub fn destroy_audio_modification(&self, audio_modification: AudioModificationRef) -> Result<()> {
        self.call(Selector::DestroyAudioModification, &(self.remote()?, audio_modification))
    }

    pub fn create_playback_region(
        &self,
        audio_modification: AudioModificationRef,
        host_ref: PlaybackRegionHostRef,
        properties: &PlaybackRegionProperties,
    ) -> Result<PlaybackRegionRef> {
        self.call(
            Selector::CreatePlaybackRegion,
            &(self.remote()?, audio_modification, host_ref, properties),
        )
    }

    pub fn update_playback_region_properties(
        &self,
        playback_region: PlaybackRegionRef,
        properties: &PlaybackRegionProperties,
    ) -> Result<()> {
        self.call(
            Selector::UpdatePlaybackRegionProperties,
            &(self.remote()?, playback_region, properties),
        )
    }

    pub fn get_playback_region_head_and_tail_time(
        &self,
        playback_region: PlaybackRegionRef,
    ) -> Result<PlaybackRegionHeadAndTailTime> {
        self.call(
            Selector::GetPlaybackRegionHeadAndTailTime,
            &(self.remote()?, playback_region),
        )
    }

    pub fn destroy_playback_region(&self, playback_region: PlaybackRegionRef) -> Result<()> {
        self.call(Selector::DestroyPlaybackRegion, &(self.remote()?, playback_region))
    }

    // ========================================================================
    // Processing algorithms
    // ========================================================================

    pub fn get_processing_algorithms_count(&self) -> Result<i32> {
        self.call(Selector::GetProcessingAlgorithmsCount, &self.remote()?)
    }

    pub fn get_processing_algorithm_properties(
        &self,
        algorithm_index: i32,
    ) -> Result<Option<ProcessingAlgorithmProperties>> {
        self.call(
            Selector::GetProcessingAlgorithmProperties,
            &(self.remote()?, algorithm_index),
        )
    }
}
