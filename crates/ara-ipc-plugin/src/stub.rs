//! Plug-in side call router.
//!
//! The stub owns every object the host addresses: document controllers and
//! the role objects of bound plug-in extensions live in generational tables
//! whose handle bits are the refs the host sees. Model refs minted by the real
//! plug-in are tracked per controller in live registries. Every ref in an
//! incoming call is validated before the plug-in is called.

use crate::archiving::ArchivingProxy;
use crate::audio_access::AudioAccessProxy;
use crate::content_access::ContentAccessProxy;
use crate::host_link::HostLink;
use crate::notifications::{ModelUpdateProxy, PlaybackControllerProxy};
use crate::registry::LiveRegistry;
use ara_ipc_core::api::{
    DocumentController, EditorRenderer, EditorView, HostInterfaces, PlaybackRenderer, PlugInExtension,
    PlugInFactory, PlugInHostContext,
};
use ara_ipc_core::codec::{decode, encode};
use ara_ipc_core::content::encode_content_event_as;
use ara_ipc_core::model::{
    AudioModificationProperties, AudioSourceProperties, ContentTimeRange, ContentUpdateFlags, DocumentProperties,
    MusicalContextProperties, PlaybackRegionProperties, PlugInRoles, RegionSequenceProperties, RestoreObjectsFilter,
    StoreObjectsFilter, ViewSelection,
};
use ara_ipc_core::refs::{
    ArchiveReaderHostRef, ArchiveWriterHostRef, AudioModificationHostRef, AudioModificationRef, AudioSourceHostRef,
    AudioSourceRef, ContentReaderRef, DocumentControllerHostRef, DocumentControllerRef, EditorRendererRef,
    EditorViewRef, MusicalContextHostRef, MusicalContextRef, PlaybackRegionHostRef, PlaybackRegionRef,
    PlaybackRendererRef, PlugInExtensionRef, RegionSequenceHostRef, RegionSequenceRef,
};
use ara_ipc_core::{
    AraBool, Connection, ContentType, Dispatch, ExtensionBinding, Handle, HandleTable, HostInterfacePresence,
    Interface, IpcError, ObjectKind, RenderAccessGate, Result, Selector,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Plug-in refs issued under one document controller.
struct ModelObjects {
    musical_contexts: LiveRegistry<MusicalContextRef>,
    region_sequences: LiveRegistry<RegionSequenceRef>,
    audio_sources: LiveRegistry<AudioSourceRef>,
    audio_modifications: LiveRegistry<AudioModificationRef>,
    playback_regions: LiveRegistry<PlaybackRegionRef>,
    content_readers: LiveRegistry<ContentReaderRef, ContentType>,
}

impl ModelObjects {
    fn new() -> Self {
        Self {
            musical_contexts: LiveRegistry::new(ObjectKind::MusicalContext),
            region_sequences: LiveRegistry::new(ObjectKind::RegionSequence),
            audio_sources: LiveRegistry::new(ObjectKind::AudioSource),
            audio_modifications: LiveRegistry::new(ObjectKind::AudioModification),
            playback_regions: LiveRegistry::new(ObjectKind::PlaybackRegion),
            content_readers: LiveRegistry::new(ObjectKind::ContentReader),
        }
    }

    fn clear(&mut self) {
        self.musical_contexts.clear();
        self.region_sequences.clear();
        self.audio_sources.clear();
        self.audio_modifications.clear();
        self.playback_regions.clear();
        self.content_readers.clear();
    }

    // Null refs in properties mean "none".

    fn check_region_sequence_properties(&self, properties: &RegionSequenceProperties) -> Result<()> {
        if !properties.musical_context.is_null() {
            self.musical_contexts.check(properties.musical_context)?;
        }
        Ok(())
    }

    fn check_playback_region_properties(&self, properties: &PlaybackRegionProperties) -> Result<()> {
        if !properties.musical_context.is_null() {
            self.musical_contexts.check(properties.musical_context)?;
        }
        if !properties.region_sequence.is_null() {
            self.region_sequences.check(properties.region_sequence)?;
        }
        Ok(())
    }

    fn check_store_filter(&self, filter: &StoreObjectsFilter) -> Result<()> {
        for audio_source in &filter.audio_sources {
            self.audio_sources.check(*audio_source)?;
        }
        for audio_modification in &filter.audio_modifications {
            self.audio_modifications.check(*audio_modification)?;
        }
        Ok(())
    }

    fn check_selection(&self, selection: &ViewSelection) -> Result<()> {
        for playback_region in &selection.playback_regions {
            self.playback_regions.check(*playback_region)?;
        }
        for region_sequence in &selection.region_sequences {
            self.region_sequences.check(*region_sequence)?;
        }
        Ok(())
    }
}

#[derive(Clone)]
struct ControllerEntry {
    controller: Arc<dyn DocumentController>,
    render_access: Arc<RenderAccessGate>,
    host_ref: DocumentControllerHostRef,
    objects: Arc<Mutex<ModelObjects>>,
    bound_extensions: usize,
    /// Destroyed by the host but kept for its bound extensions' role calls.
    destroy_requested: bool,
}

/// A role object plus the controller it was bound to.
struct RoleEntry<T: ?Sized> {
    role: Arc<T>,
    controller: Handle,
}

impl<T: ?Sized> Clone for RoleEntry<T> {
    fn clone(&self) -> Self {
        Self {
            role: self.role.clone(),
            controller: self.controller,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    controller: Handle,
    playback_renderer: Option<Handle>,
    editor_renderer: Option<Handle>,
    editor_view: Option<Handle>,
}

struct ExtensionEntry {
    extension: Arc<dyn PlugInExtension>,
    binding: Option<Binding>,
}

/// Routes host calls to the real plug-in.
pub struct PlugInStub {
    connection: Weak<Connection>,
    factories: Vec<Arc<dyn PlugInFactory>>,
    controllers: Mutex<HandleTable<ControllerEntry>>,
    extensions: Mutex<HandleTable<ExtensionEntry>>,
    playback_renderers: Mutex<HandleTable<RoleEntry<dyn PlaybackRenderer>>>,
    editor_renderers: Mutex<HandleTable<RoleEntry<dyn EditorRenderer>>>,
    editor_views: Mutex<HandleTable<RoleEntry<dyn EditorView>>>,
}

impl PlugInStub {
    /// Serve `factories` on `connection`, replacing its dispatcher.
    pub fn new(connection: &Arc<Connection>, factories: Vec<Arc<dyn PlugInFactory>>) -> Arc<Self> {
        let stub = Arc::new(Self {
            connection: Arc::downgrade(connection),
            factories,
            controllers: Mutex::new(HandleTable::new(ObjectKind::DocumentController)),
            extensions: Mutex::new(HandleTable::new(ObjectKind::PlugInExtension)),
            playback_renderers: Mutex::new(HandleTable::new(ObjectKind::PlaybackRenderer)),
            editor_renderers: Mutex::new(HandleTable::new(ObjectKind::EditorRenderer)),
            editor_views: Mutex::new(HandleTable::new(ObjectKind::EditorView)),
        });
        connection.set_dispatcher(stub.clone());
        stub
    }

    /// Make a plug-in instance addressable by the host.
    ///
    /// The returned ref reaches the host out of band, the same way a plug-in
    /// instance is handed to it.
    pub fn register_extension(&self, extension: Arc<dyn PlugInExtension>) -> PlugInExtensionRef {
        let handle = self.extensions.lock().insert(ExtensionEntry {
            extension,
            binding: None,
        });
        PlugInExtensionRef(handle.to_bits())
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.lock().len()
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.lock().len()
    }

    /// The render access gate handed to a live controller.
    pub fn render_access(&self, controller: DocumentControllerRef) -> Option<Arc<RenderAccessGate>> {
        self.controller(controller).ok().map(|entry| entry.render_access)
    }

    fn factory(&self, index: u32) -> Result<&Arc<dyn PlugInFactory>> {
        self.factories.get(index as usize).ok_or_else(|| {
            IpcError::InvalidArgument(format!(
                "factory index {index} out of range (have {})",
                self.factories.len()
            ))
        })
    }

    /// A controller the host has not destroyed.
    fn controller(&self, controller: DocumentControllerRef) -> Result<ControllerEntry> {
        let controllers = self.controllers.lock();
        let entry = controllers.lookup(controller.bits())?;
        if entry.destroy_requested {
            return Err(IpcError::StaleHandle {
                kind: ObjectKind::DocumentController,
                handle: controller.bits(),
            });
        }
        Ok(entry.clone())
    }

    fn finalize_controller(&self, handle: Handle) {
        let Some(entry) = self.controllers.lock().remove(handle) else {
            return;
        };
        entry.render_access.disable();
        entry.controller.destroy_document_controller();
        entry.objects.lock().clear();
        info!(
            controller = handle.to_bits(),
            host_ref = entry.host_ref.bits(),
            "document controller destroyed"
        );
    }

    /// An extension bound to `controller` went away; completes a deferred destroy.
    fn unbind_controller(&self, controller: Handle) {
        let finalize = match self.controllers.lock().get_mut(controller) {
            Some(entry) => {
                entry.bound_extensions = entry.bound_extensions.saturating_sub(1);
                entry.destroy_requested && entry.bound_extensions == 0
            }
            None => false,
        };
        if finalize {
            self.finalize_controller(controller);
        }
    }

    fn objects_of(&self, controller: Handle) -> Result<Arc<Mutex<ModelObjects>>> {
        self.controllers
            .lock()
            .get(controller)
            .map(|entry| entry.objects.clone())
            .ok_or(IpcError::StaleHandle {
                kind: ObjectKind::DocumentController,
                handle: controller.to_bits(),
            })
    }

    fn host_interfaces(
        connection: &Arc<Connection>,
        host_ref: DocumentControllerHostRef,
        presence: HostInterfacePresence,
    ) -> HostInterfaces {
        let link = HostLink::new(connection, host_ref);
        let mut host = HostInterfaces::new(
            Arc::new(AudioAccessProxy::new(link.clone())),
            Arc::new(ArchivingProxy::new(link.clone())),
        );
        if presence.content_access {
            host = host.with_content_access(Arc::new(ContentAccessProxy::new(link.clone())));
        }
        if presence.model_update {
            host = host.with_model_update(Arc::new(ModelUpdateProxy::new(link.clone())));
        }
        if presence.playback {
            host = host.with_playback(Arc::new(PlaybackControllerProxy::new(link)));
        }
        host
    }

    fn release_binding(&self, binding: Binding) {
        if let Some(handle) = binding.playback_renderer {
            self.playback_renderers.lock().remove(handle);
        }
        if let Some(handle) = binding.editor_renderer {
            self.editor_renderers.lock().remove(handle);
        }
        if let Some(handle) = binding.editor_view {
            self.editor_views.lock().remove(handle);
        }
    }
}

impl Dispatch for PlugInStub {
    fn dispatch(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        debug!(%selector, "plug-in call");
        match selector.interface() {
            Interface::Factory => self.factory_call(selector, payload),
            Interface::DocumentController => self.document_call(selector, payload),
            Interface::PlaybackRenderer | Interface::EditorRenderer | Interface::EditorView => {
                self.role_call(selector, payload)
            }
            Interface::PlugInExtension => self.extension_call(selector, payload),
            // Host callbacks never arrive at the plug-in.
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }
}

impl PlugInStub {
    fn factory_call(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::GetFactoriesCount => encode(&(self.factories.len() as u32)),
            Selector::GetFactory => {
                let index: u32 = decode(payload)?;
                encode(&self.factory(index)?.descriptor())
            }
            Selector::CreateDocumentController => {
                let (index, host_ref, presence, properties): (
                    u32,
                    DocumentControllerHostRef,
                    HostInterfacePresence,
                    DocumentProperties,
                ) = decode(payload)?;
                let factory = self.factory(index)?;
                let connection = self.connection.upgrade().ok_or(IpcError::Disconnected)?;

                let render_access = RenderAccessGate::shared();
                let context = PlugInHostContext {
                    host: Self::host_interfaces(&connection, host_ref, presence),
                    render_access: render_access.clone(),
                };
                let controller = factory
                    .create_document_controller(context, &properties)
                    .ok_or_else(|| {
                        IpcError::InvalidState(format!("factory {index} did not create a document controller"))
                    })?;

                let handle = self.controllers.lock().insert(ControllerEntry {
                    controller,
                    render_access,
                    host_ref,
                    objects: Arc::new(Mutex::new(ModelObjects::new())),
                    bound_extensions: 0,
                    destroy_requested: false,
                });
                info!(
                    factory = index,
                    controller = handle.to_bits(),
                    host_ref = host_ref.bits(),
                    "document controller created"
                );
                encode(&DocumentControllerRef(handle.to_bits()))
            }
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }

    fn document_call(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            // ================================================================
            // Document
            // ================================================================
            Selector::DestroyDocumentController => {
                let controller: DocumentControllerRef = decode(payload)?;
                let (handle, deferred) = {
                    let mut controllers = self.controllers.lock();
                    let handle = controllers.resolve(controller.bits())?;
                    let entry = controllers
                        .get_mut(handle)
                        .expect("BUG: resolved handle must have a value");
                    if entry.destroy_requested {
                        return Err(IpcError::StaleHandle {
                            kind: ObjectKind::DocumentController,
                            handle: controller.bits(),
                        });
                    }
                    entry.destroy_requested = true;
                    (handle, entry.bound_extensions > 0)
                };
                if deferred {
                    debug!(controller = controller.bits(), "document controller destruction waits for its extensions");
                } else {
                    self.finalize_controller(handle);
                }
                encode(&())
            }
            Selector::BeginEditing => {
                let entry = self.controller(decode(payload)?)?;
                entry.render_access.disable();
                entry.controller.begin_editing();
                encode(&())
            }
            Selector::EndEditing => {
                let entry = self.controller(decode(payload)?)?;
                entry.controller.end_editing();
                entry.render_access.enable();
                encode(&())
            }
            Selector::NotifyModelUpdates => {
                let entry = self.controller(decode(payload)?)?;
                entry.controller.notify_model_updates();
                encode(&())
            }
            Selector::RestoreObjectsFromArchive => {
                let (controller, reader, filter): (DocumentControllerRef, ArchiveReaderHostRef, Option<RestoreObjectsFilter>) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                let restored = entry.controller.restore_objects_from_archive(reader, filter.as_ref());
                encode(&AraBool(restored))
            }
            Selector::StoreObjectsToArchive => {
                let (controller, writer, filter): (DocumentControllerRef, ArchiveWriterHostRef, Option<StoreObjectsFilter>) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                if let Some(filter) = &filter {
                    entry.objects.lock().check_store_filter(filter)?;
                }
                let stored = entry.controller.store_objects_to_archive(writer, filter.as_ref());
                encode(&AraBool(stored))
            }
            Selector::StoreAudioSourceToAudioFileChunk => {
                let (controller, writer, audio_source): (DocumentControllerRef, ArchiveWriterHostRef, AudioSourceRef) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                encode(&entry.controller.store_audio_source_to_audio_file_chunk(writer, audio_source))
            }
            Selector::UpdateDocumentProperties => {
                let (controller, properties): (DocumentControllerRef, DocumentProperties) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.controller.update_document_properties(&properties);
                encode(&())
            }

            // ================================================================
            // Musical contexts and region sequences
            // ================================================================
            Selector::CreateMusicalContext => {
                let (controller, host_ref, properties): (
                    DocumentControllerRef,
                    MusicalContextHostRef,
                    MusicalContextProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                let musical_context = entry.controller.create_musical_context(host_ref, &properties);
                entry.objects.lock().musical_contexts.insert(musical_context, ());
                encode(&musical_context)
            }
            Selector::UpdateMusicalContextProperties => {
                let (controller, musical_context, properties): (
                    DocumentControllerRef,
                    MusicalContextRef,
                    MusicalContextProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().musical_contexts.check(musical_context)?;
                entry
                    .controller
                    .update_musical_context_properties(musical_context, &properties);
                encode(&())
            }
            Selector::UpdateMusicalContextContent => {
                let (controller, musical_context, range, flags): (
                    DocumentControllerRef,
                    MusicalContextRef,
                    Option<ContentTimeRange>,
                    ContentUpdateFlags,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().musical_contexts.check(musical_context)?;
                entry
                    .controller
                    .update_musical_context_content(musical_context, range, flags);
                encode(&())
            }
            Selector::DestroyMusicalContext => {
                let (controller, musical_context): (DocumentControllerRef, MusicalContextRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().musical_contexts.take(musical_context)?;
                entry.controller.destroy_musical_context(musical_context);
                encode(&())
            }
            Selector::CreateRegionSequence => {
                let (controller, host_ref, properties): (
                    DocumentControllerRef,
                    RegionSequenceHostRef,
                    RegionSequenceProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().check_region_sequence_properties(&properties)?;
                let region_sequence = entry.controller.create_region_sequence(host_ref, &properties);
                entry.objects.lock().region_sequences.insert(region_sequence, ());
                encode(&region_sequence)
            }
            Selector::UpdateRegionSequenceProperties => {
                let (controller, region_sequence, properties): (
                    DocumentControllerRef,
                    RegionSequenceRef,
                    RegionSequenceProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                {
                    let objects = entry.objects.lock();
                    objects.region_sequences.check(region_sequence)?;
                    objects.check_region_sequence_properties(&properties)?;
                }
                entry
                    .controller
                    .update_region_sequence_properties(region_sequence, &properties);
                encode(&())
            }
            Selector::DestroyRegionSequence => {
                let (controller, region_sequence): (DocumentControllerRef, RegionSequenceRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().region_sequences.take(region_sequence)?;
                entry.controller.destroy_region_sequence(region_sequence);
                encode(&())
            }

            // ================================================================
            // Audio sources
            // ================================================================
            Selector::CreateAudioSource => {
                let (controller, host_ref, properties): (DocumentControllerRef, AudioSourceHostRef, AudioSourceProperties) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                let audio_source = entry.controller.create_audio_source(host_ref, &properties);
                entry.objects.lock().audio_sources.insert(audio_source, ());
                encode(&audio_source)
            }
            Selector::UpdateAudioSourceProperties => {
                let (controller, audio_source, properties): (DocumentControllerRef, AudioSourceRef, AudioSourceProperties) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                entry
                    .controller
                    .update_audio_source_properties(audio_source, &properties);
                encode(&())
            }
            Selector::UpdateAudioSourceContent => {
                let (controller, audio_source, range, flags): (
                    DocumentControllerRef,
                    AudioSourceRef,
                    Option<ContentTimeRange>,
                    ContentUpdateFlags,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                entry.controller.update_audio_source_content(audio_source, range, flags);
                encode(&())
            }
            Selector::EnableAudioSourceSamplesAccess => {
                let (controller, audio_source, enable): (DocumentControllerRef, AudioSourceRef, AraBool) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                entry
                    .controller
                    .enable_audio_source_samples_access(audio_source, enable.into());
                encode(&())
            }
            Selector::DeactivateAudioSourceForUndoHistory => {
                let (controller, audio_source, deactivate): (DocumentControllerRef, AudioSourceRef, AraBool) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                entry
                    .controller
                    .deactivate_audio_source_for_undo_history(audio_source, deactivate.into());
                encode(&())
            }
            Selector::DestroyAudioSource => {
                let (controller, audio_source): (DocumentControllerRef, AudioSourceRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.take(audio_source)?;
                entry.controller.destroy_audio_source(audio_source);
                encode(&())
            }

            // ================================================================
            // Audio modifications
            // ================================================================
            Selector::CreateAudioModification => {
                let (controller, audio_source, host_ref, properties): (
                    DocumentControllerRef,
                    AudioSourceRef,
                    AudioModificationHostRef,
                    AudioModificationProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                let audio_modification = entry
                    .controller
                    .create_audio_modification(audio_source, host_ref, &properties);
                entry.objects.lock().audio_modifications.insert(audio_modification, ());
                encode(&audio_modification)
            }
            Selector::CloneAudioModification => {
                let (controller, source, host_ref, properties): (
                    DocumentControllerRef,
                    AudioModificationRef,
                    AudioModificationHostRef,
                    AudioModificationProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.check(source)?;
                let audio_modification = entry
                    .controller
                    .clone_audio_modification(source, host_ref, &properties);
                entry.objects.lock().audio_modifications.insert(audio_modification, ());
                encode(&audio_modification)
            }
            Selector::UpdateAudioModificationProperties => {
                let (controller, audio_modification, properties): (
                    DocumentControllerRef,
                    AudioModificationRef,
                    AudioModificationProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.check(audio_modification)?;
                entry
                    .controller
                    .update_audio_modification_properties(audio_modification, &properties);
                encode(&())
            }
            Selector::IsAudioModificationPreservingAudioSourceSignal => {
                let (controller, audio_modification): (DocumentControllerRef, AudioModificationRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.check(audio_modification)?;
                let preserving = entry
                    .controller
                    .is_audio_modification_preserving_audio_source_signal(audio_modification);
                encode(&AraBool(preserving))
            }
            Selector::DeactivateAudioModificationForUndoHistory => {
                let (controller, audio_modification, deactivate): (DocumentControllerRef, AudioModificationRef, AraBool) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.check(audio_modification)?;
                entry
                    .controller
                    .deactivate_audio_modification_for_undo_history(audio_modification, deactivate.into());
                encode(&())
            }
            Selector::DestroyAudioModification => {
                let (controller, audio_modification): (DocumentControllerRef, AudioModificationRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.take(audio_modification)?;
                entry.controller.destroy_audio_modification(audio_modification);
                encode(&())
            }

            // ================================================================
            // Playback regions
            // ================================================================
            Selector::CreatePlaybackRegion => {
                let (controller, audio_modification, host_ref, properties): (
                    DocumentControllerRef,
                    AudioModificationRef,
                    PlaybackRegionHostRef,
                    PlaybackRegionProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                {
                    let objects = entry.objects.lock();
                    objects.audio_modifications.check(audio_modification)?;
                    objects.check_playback_region_properties(&properties)?;
                }
                let playback_region = entry
                    .controller
                    .create_playback_region(audio_modification, host_ref, &properties);
                entry.objects.lock().playback_regions.insert(playback_region, ());
                encode(&playback_region)
            }
            Selector::UpdatePlaybackRegionProperties => {
                let (controller, playback_region, properties): (
                    DocumentControllerRef,
                    PlaybackRegionRef,
                    PlaybackRegionProperties,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                {
                    let objects = entry.objects.lock();
                    objects.playback_regions.check(playback_region)?;
                    objects.check_playback_region_properties(&properties)?;
                }
                entry
                    .controller
                    .update_playback_region_properties(playback_region, &properties);
                encode(&())
            }
            Selector::GetPlaybackRegionHeadAndTailTime => {
                let (controller, playback_region): (DocumentControllerRef, PlaybackRegionRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().playback_regions.check(playback_region)?;
                encode(&entry.controller.get_playback_region_head_and_tail_time(playback_region))
            }
            Selector::DestroyPlaybackRegion => {
                let (controller, playback_region): (DocumentControllerRef, PlaybackRegionRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().playback_regions.take(playback_region)?;
                entry.controller.destroy_playback_region(playback_region);
                encode(&())
            }

            // ================================================================
            // Content
            // ================================================================
            Selector::IsAudioSourceContentAvailable => {
                let (controller, audio_source, content_type): (DocumentControllerRef, AudioSourceRef, ContentType) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                let available = entry
                    .controller
                    .is_audio_source_content_available(audio_source, content_type);
                encode(&AraBool(available))
            }
            Selector::GetAudioSourceContentGrade => {
                let (controller, audio_source, content_type): (DocumentControllerRef, AudioSourceRef, ContentType) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                encode(&entry.controller.get_audio_source_content_grade(audio_source, content_type))
            }
            Selector::CreateAudioSourceContentReader => {
                let (controller, audio_source, content_type, range): (
                    DocumentControllerRef,
                    AudioSourceRef,
                    ContentType,
                    Option<ContentTimeRange>,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                let reader = entry
                    .controller
                    .create_audio_source_content_reader(audio_source, content_type, range);
                encode(&register_content_reader(&entry, reader, content_type))
            }
            Selector::IsAudioModificationContentAvailable => {
                let (controller, audio_modification, content_type): (
                    DocumentControllerRef,
                    AudioModificationRef,
                    ContentType,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.check(audio_modification)?;
                let available = entry
                    .controller
                    .is_audio_modification_content_available(audio_modification, content_type);
                encode(&AraBool(available))
            }
            Selector::GetAudioModificationContentGrade => {
                let (controller, audio_modification, content_type): (
                    DocumentControllerRef,
                    AudioModificationRef,
                    ContentType,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.check(audio_modification)?;
                encode(
                    &entry
                        .controller
                        .get_audio_modification_content_grade(audio_modification, content_type),
                )
            }
            Selector::CreateAudioModificationContentReader => {
                let (controller, audio_modification, content_type, range): (
                    DocumentControllerRef,
                    AudioModificationRef,
                    ContentType,
                    Option<ContentTimeRange>,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_modifications.check(audio_modification)?;
                let reader = entry
                    .controller
                    .create_audio_modification_content_reader(audio_modification, content_type, range);
                encode(&register_content_reader(&entry, reader, content_type))
            }
            Selector::IsPlaybackRegionContentAvailable => {
                let (controller, playback_region, content_type): (DocumentControllerRef, PlaybackRegionRef, ContentType) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().playback_regions.check(playback_region)?;
                let available = entry
                    .controller
                    .is_playback_region_content_available(playback_region, content_type);
                encode(&AraBool(available))
            }
            Selector::GetPlaybackRegionContentGrade => {
                let (controller, playback_region, content_type): (DocumentControllerRef, PlaybackRegionRef, ContentType) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().playback_regions.check(playback_region)?;
                encode(
                    &entry
                        .controller
                        .get_playback_region_content_grade(playback_region, content_type),
                )
            }
            Selector::CreatePlaybackRegionContentReader => {
                let (controller, playback_region, content_type, range): (
                    DocumentControllerRef,
                    PlaybackRegionRef,
                    ContentType,
                    Option<ContentTimeRange>,
                ) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().playback_regions.check(playback_region)?;
                let reader = entry
                    .controller
                    .create_playback_region_content_reader(playback_region, content_type, range);
                encode(&register_content_reader(&entry, reader, content_type))
            }
            Selector::GetContentReaderEventCount => {
                let (controller, reader): (DocumentControllerRef, ContentReaderRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().content_readers.check(reader)?;
                encode(&entry.controller.get_content_reader_event_count(reader))
            }
            Selector::GetContentReaderDataForEvent => {
                let (controller, reader, event_index): (DocumentControllerRef, ContentReaderRef, i32) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                let content_type = *entry.objects.lock().content_readers.get(reader)?;
                let data = entry
                    .controller
                    .get_content_reader_data_for_event(reader, event_index)
                    .map(|event| encode_content_event_as(content_type, &event))
                    .transpose()?;
                encode(&data)
            }
            Selector::DestroyContentReader => {
                let (controller, reader): (DocumentControllerRef, ContentReaderRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().content_readers.take(reader)?;
                entry.controller.destroy_content_reader(reader);
                encode(&())
            }

            // ================================================================
            // Analysis and processing algorithms
            // ================================================================
            Selector::IsAudioSourceContentAnalysisIncomplete => {
                let (controller, audio_source, content_type): (DocumentControllerRef, AudioSourceRef, ContentType) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                let incomplete = entry
                    .controller
                    .is_audio_source_content_analysis_incomplete(audio_source, content_type);
                encode(&AraBool(incomplete))
            }
            Selector::RequestAudioSourceContentAnalysis => {
                let (controller, audio_source, content_types): (DocumentControllerRef, AudioSourceRef, Vec<ContentType>) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                entry
                    .controller
                    .request_audio_source_content_analysis(audio_source, &content_types);
                encode(&())
            }
            Selector::GetProcessingAlgorithmsCount => {
                let entry = self.controller(decode(payload)?)?;
                encode(&entry.controller.get_processing_algorithms_count())
            }
            Selector::GetProcessingAlgorithmProperties => {
                let (controller, algorithm_index): (DocumentControllerRef, i32) = decode(payload)?;
                let entry = self.controller(controller)?;
                encode(&entry.controller.get_processing_algorithm_properties(algorithm_index))
            }
            Selector::GetProcessingAlgorithmForAudioSource => {
                let (controller, audio_source): (DocumentControllerRef, AudioSourceRef) = decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                encode(&entry.controller.get_processing_algorithm_for_audio_source(audio_source))
            }
            Selector::RequestProcessingAlgorithmForAudioSource => {
                let (controller, audio_source, algorithm_index): (DocumentControllerRef, AudioSourceRef, i32) =
                    decode(payload)?;
                let entry = self.controller(controller)?;
                entry.objects.lock().audio_sources.check(audio_source)?;
                let count = entry.controller.get_processing_algorithms_count();
                if algorithm_index < 0 || algorithm_index >= count {
                    return Err(IpcError::InvalidArgument(format!(
                        "processing algorithm index {algorithm_index} out of range (have {count})"
                    )));
                }
                entry
                    .controller
                    .request_processing_algorithm_for_audio_source(audio_source, algorithm_index);
                encode(&())
            }
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }

    fn role_call(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::PlaybackRendererAddPlaybackRegion | Selector::PlaybackRendererRemovePlaybackRegion => {
                let (renderer, playback_region): (PlaybackRendererRef, PlaybackRegionRef) = decode(payload)?;
                let entry = self.playback_renderers.lock().lookup(renderer.bits())?.clone();
                self.objects_of(entry.controller)?
                    .lock()
                    .playback_regions
                    .check(playback_region)?;
                if selector == Selector::PlaybackRendererAddPlaybackRegion {
                    entry.role.add_playback_region(playback_region);
                } else {
                    entry.role.remove_playback_region(playback_region);
                }
            }
            Selector::EditorRendererAddPlaybackRegion | Selector::EditorRendererRemovePlaybackRegion => {
                let (renderer, playback_region): (EditorRendererRef, PlaybackRegionRef) = decode(payload)?;
                let entry = self.editor_renderers.lock().lookup(renderer.bits())?.clone();
                self.objects_of(entry.controller)?
                    .lock()
                    .playback_regions
                    .check(playback_region)?;
                if selector == Selector::EditorRendererAddPlaybackRegion {
                    entry.role.add_playback_region(playback_region);
                } else {
                    entry.role.remove_playback_region(playback_region);
                }
            }
            Selector::EditorRendererAddRegionSequence | Selector::EditorRendererRemoveRegionSequence => {
                let (renderer, region_sequence): (EditorRendererRef, RegionSequenceRef) = decode(payload)?;
                let entry = self.editor_renderers.lock().lookup(renderer.bits())?.clone();
                self.objects_of(entry.controller)?
                    .lock()
                    .region_sequences
                    .check(region_sequence)?;
                if selector == Selector::EditorRendererAddRegionSequence {
                    entry.role.add_region_sequence(region_sequence);
                } else {
                    entry.role.remove_region_sequence(region_sequence);
                }
            }
            Selector::EditorViewNotifySelection => {
                let (view, selection): (EditorViewRef, ViewSelection) = decode(payload)?;
                let entry = self.editor_views.lock().lookup(view.bits())?.clone();
                self.objects_of(entry.controller)?.lock().check_selection(&selection)?;
                entry.role.notify_selection(&selection);
            }
            Selector::EditorViewNotifyHideRegionSequences => {
                let (view, region_sequences): (EditorViewRef, Vec<RegionSequenceRef>) = decode(payload)?;
                let entry = self.editor_views.lock().lookup(view.bits())?.clone();
                {
                    let objects = self.objects_of(entry.controller)?;
                    let objects = objects.lock();
                    for region_sequence in &region_sequences {
                        objects.region_sequences.check(*region_sequence)?;
                    }
                }
                entry.role.notify_hide_region_sequences(&region_sequences);
            }
            _ => return Err(IpcError::UnknownSelector(selector as u32)),
        }
        encode(&())
    }

    fn extension_call(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::BindToDocumentController => {
                let (extension, controller, known_roles, assigned_roles): (
                    PlugInExtensionRef,
                    DocumentControllerRef,
                    PlugInRoles,
                    PlugInRoles,
                ) = decode(payload)?;
                let (extension_handle, instance) = {
                    let extensions = self.extensions.lock();
                    let handle = extensions.resolve(extension.bits())?;
                    let entry = extensions
                        .get(handle)
                        .expect("BUG: resolved handle must have a value");
                    if entry.binding.is_some() {
                        return Err(IpcError::InvalidState(format!(
                            "plug-in extension {:#x} is already bound",
                            extension.bits()
                        )));
                    }
                    (handle, entry.extension.clone())
                };
                let controller_handle = self.controllers.lock().resolve(controller.bits())?;
                let entry = self.controller(controller)?;

                let roles = instance.bind_to_document_controller(&entry.controller, known_roles, assigned_roles);
                let binding = Binding {
                    controller: controller_handle,
                    playback_renderer: roles.playback_renderer.map(|role| {
                        self.playback_renderers.lock().insert(RoleEntry {
                            role,
                            controller: controller_handle,
                        })
                    }),
                    editor_renderer: roles.editor_renderer.map(|role| {
                        self.editor_renderers.lock().insert(RoleEntry {
                            role,
                            controller: controller_handle,
                        })
                    }),
                    editor_view: roles.editor_view.map(|role| {
                        self.editor_views.lock().insert(RoleEntry {
                            role,
                            controller: controller_handle,
                        })
                    }),
                };

                let counted = match self.controllers.lock().get_mut(controller_handle) {
                    Some(entry) if !entry.destroy_requested => {
                        entry.bound_extensions += 1;
                        true
                    }
                    _ => false,
                };
                if !counted {
                    // Destroyed while binding.
                    self.release_binding(binding);
                    return Err(IpcError::StaleHandle {
                        kind: ObjectKind::DocumentController,
                        handle: controller.bits(),
                    });
                }

                let stored = match self.extensions.lock().get_mut(extension_handle) {
                    Some(entry) => {
                        entry.binding = Some(binding);
                        true
                    }
                    None => false,
                };
                if !stored {
                    // Destroyed while binding.
                    self.release_binding(binding);
                    self.unbind_controller(controller_handle);
                    return Err(IpcError::StaleHandle {
                        kind: ObjectKind::PlugInExtension,
                        handle: extension.bits(),
                    });
                }
                debug!(
                    extension = extension.bits(),
                    controller = controller.bits(),
                    ?binding,
                    "plug-in extension bound"
                );
                encode(&ExtensionBinding {
                    playback_renderer: binding.playback_renderer.map(|h| PlaybackRendererRef(h.to_bits())),
                    editor_renderer: binding.editor_renderer.map(|h| EditorRendererRef(h.to_bits())),
                    editor_view: binding.editor_view.map(|h| EditorViewRef(h.to_bits())),
                })
            }
            Selector::DestroyPlugInExtension => {
                let extension: PlugInExtensionRef = decode(payload)?;
                let entry = self.extensions.lock().take(extension.bits())?;
                if let Some(binding) = entry.binding {
                    self.release_binding(binding);
                    self.unbind_controller(binding.controller);
                }
                debug!(extension = extension.bits(), "plug-in extension destroyed");
                encode(&())
            }
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }
}

fn register_content_reader(
    entry: &ControllerEntry,
    reader: Option<ContentReaderRef>,
    content_type: ContentType,
) -> Option<ContentReaderRef> {
    let reader = reader.filter(|r| !r.is_null())?;
    entry.objects.lock().content_readers.insert(reader, content_type);
    Some(reader)
}
