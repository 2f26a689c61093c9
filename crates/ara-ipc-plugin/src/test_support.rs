//! Unit test fixtures: a scripted host peer and a recording plug-in.

use crate::host_link::HostLink;
use ara_ipc_core::api::{
    BoundRoles, DocumentController, PlaybackRenderer, PlugInExtension, PlugInFactory, PlugInHostContext,
};
use ara_ipc_core::content::KeySignature;
use ara_ipc_core::model::{
    AudioModificationProperties, AudioSourceProperties, ContentGrade, ContentTimeRange, ContentUpdateFlags,
    DocumentProperties, FactoryDescriptor, MusicalContextProperties, PlaybackRegionHeadAndTailTime,
    PlaybackRegionProperties, PlugInRoles, RegionSequenceProperties, RestoreObjectsFilter, StoreObjectsFilter,
};
use ara_ipc_core::refs::{
    ArchiveReaderHostRef, ArchiveWriterHostRef, AudioModificationHostRef, AudioModificationRef, AudioSourceHostRef,
    AudioSourceRef, ContentReaderRef, DocumentControllerHostRef, MusicalContextHostRef, MusicalContextRef,
    PlaybackRegionHostRef, PlaybackRegionRef, RegionSequenceHostRef, RegionSequenceRef,
};
use ara_ipc_core::{Connection, ContentEvent, ContentType, Dispatch, IpcConfig, Result, Selector};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) const CONTROLLER: DocumentControllerHostRef = DocumentControllerHostRef(0x0100_0001_0000_0000);

struct Scripted<F>(F);

impl<F> Dispatch for Scripted<F>
where
    F: Fn(Selector, &[u8]) -> Result<Vec<u8>> + Send + Sync,
{
    fn dispatch(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        (self.0)(selector, payload)
    }
}

/// The plug-in end of a connection whose host answers with `script`.
///
/// Close the returned connection to end the host thread.
pub(crate) fn scripted_host<F>(script: F) -> (Arc<Connection>, JoinHandle<()>)
where
    F: Fn(Selector, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    scripted_host_with_frame_limit(IpcConfig::default().max_frame_size, script)
}

pub(crate) fn scripted_host_with_frame_limit<F>(max_frame_size: usize, script: F) -> (Arc<Connection>, JoinHandle<()>)
where
    F: Fn(Selector, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    let (host, plugin) = Connection::pair_with_frame_limit(max_frame_size);
    host.set_dispatcher(Arc::new(Scripted(script)));
    let handle = thread::spawn(move || {
        let _ = host.serve();
        host.clear_dispatcher();
    });
    (plugin, handle)
}

pub(crate) fn link(connection: &Arc<Connection>) -> HostLink {
    HostLink::new(connection, CONTROLLER)
}

/// A plug-in that logs every call it receives.
#[derive(Default)]
pub(crate) struct RecordingFactory {
    refuse: bool,
    controllers: Mutex<Vec<Arc<RecordingController>>>,
}

impl RecordingFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Default::default()
        })
    }

    pub(crate) fn controller(&self, index: usize) -> Arc<RecordingController> {
        self.controllers.lock()[index].clone()
    }
}

impl PlugInFactory for RecordingFactory {
    fn descriptor(&self) -> FactoryDescriptor {
        FactoryDescriptor {
            factory_id: "com.example.recorder".into(),
            plugin_name: "Recorder".into(),
            document_archive_id: "com.example.recorder.archive".into(),
            ..Default::default()
        }
    }

    fn create_document_controller(
        &self,
        context: PlugInHostContext,
        _properties: &DocumentProperties,
    ) -> Option<Arc<dyn DocumentController>> {
        if self.refuse {
            return None;
        }
        let controller = Arc::new(RecordingController {
            context,
            next_ref: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
        });
        self.controllers.lock().push(controller.clone());
        Some(controller)
    }
}

pub(crate) struct RecordingController {
    pub(crate) context: PlugInHostContext,
    next_ref: AtomicU64,
    calls: Mutex<Vec<String>>,
}

impl RecordingController {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn issue(&self) -> u64 {
        self.next_ref.fetch_add(1, Ordering::Relaxed)
    }
}

impl DocumentController for RecordingController {
    fn destroy_document_controller(&self) {
        self.record("destroy_document_controller");
    }

    fn begin_editing(&self) {
        let gate = self.context.render_access.is_enabled();
        self.record(format!("begin_editing render_access={gate}"));
    }

    fn end_editing(&self) {
        self.record("end_editing");
    }

    fn notify_model_updates(&self) {
        self.record("notify_model_updates");
    }

    fn restore_objects_from_archive(&self, _reader: ArchiveReaderHostRef, _filter: Option<&RestoreObjectsFilter>) -> bool {
        self.record("restore_objects_from_archive");
        true
    }

    fn store_objects_to_archive(&self, _writer: ArchiveWriterHostRef, filter: Option<&StoreObjectsFilter>) -> bool {
        self.record(format!("store_objects_to_archive filtered={}", filter.is_some()));
        true
    }

    fn update_document_properties(&self, _properties: &DocumentProperties) {
        self.record("update_document_properties");
    }

    fn create_musical_context(&self, _host_ref: MusicalContextHostRef, _properties: &MusicalContextProperties) -> MusicalContextRef {
        MusicalContextRef(self.issue())
    }

    fn update_musical_context_properties(&self, musical_context: MusicalContextRef, _properties: &MusicalContextProperties) {
        self.record(format!("update_musical_context_properties {}", musical_context.bits()));
    }

    fn update_musical_context_content(&self, _musical_context: MusicalContextRef, _range: Option<ContentTimeRange>, _flags: ContentUpdateFlags) {}

    fn destroy_musical_context(&self, musical_context: MusicalContextRef) {
        self.record(format!("destroy_musical_context {}", musical_context.bits()));
    }

    fn create_region_sequence(&self, _host_ref: RegionSequenceHostRef, _properties: &RegionSequenceProperties) -> RegionSequenceRef {
        RegionSequenceRef(self.issue())
    }

    fn update_region_sequence_properties(&self, _region_sequence: RegionSequenceRef, _properties: &RegionSequenceProperties) {}

    fn destroy_region_sequence(&self, _region_sequence: RegionSequenceRef) {}

    fn create_audio_source(&self, _host_ref: AudioSourceHostRef, _properties: &AudioSourceProperties) -> AudioSourceRef {
        AudioSourceRef(self.issue())
    }

    fn update_audio_source_properties(&self, _audio_source: AudioSourceRef, _properties: &AudioSourceProperties) {}

    fn update_audio_source_content(&self, _audio_source: AudioSourceRef, _range: Option<ContentTimeRange>, _flags: ContentUpdateFlags) {}

    fn enable_audio_source_samples_access(&self, audio_source: AudioSourceRef, enable: bool) {
        self.record(format!("enable_audio_source_samples_access {} {enable}", audio_source.bits()));
    }

    fn deactivate_audio_source_for_undo_history(&self, _audio_source: AudioSourceRef, _deactivate: bool) {}

    fn destroy_audio_source(&self, audio_source: AudioSourceRef) {
        self.record(format!("destroy_audio_source {}", audio_source.bits()));
    }

    fn create_audio_modification(
        &self,
        _audio_source: AudioSourceRef,
        _host_ref: AudioModificationHostRef,
        _properties: &AudioModificationProperties,
    ) -> AudioModificationRef {
        AudioModificationRef(self.issue())
    }

    fn clone_audio_modification(
        &self,
        _source: AudioModificationRef,
        _host_ref: AudioModificationHostRef,
        _properties: &AudioModificationProperties,
    ) -> AudioModificationRef {
        AudioModificationRef(self.issue())
    }

    fn update_audio_modification_properties(&self, _audio_modification: AudioModificationRef, _properties: &AudioModificationProperties) {}

    fn is_audio_modification_preserving_audio_source_signal(&self, _audio_modification: AudioModificationRef) -> bool {
        true
    }

    fn deactivate_audio_modification_for_undo_history(&self, _audio_modification: AudioModificationRef, _deactivate: bool) {}

    fn destroy_audio_modification(&self, _audio_modification: AudioModificationRef) {}

    fn create_playback_region(
        &self,
        _audio_modification: AudioModificationRef,
        _host_ref: PlaybackRegionHostRef,
        _properties: &PlaybackRegionProperties,
    ) -> PlaybackRegionRef {
        PlaybackRegionRef(self.issue())
    }

    fn update_playback_region_properties(&self, _playback_region: PlaybackRegionRef, _properties: &PlaybackRegionProperties) {}

    fn get_playback_region_head_and_tail_time(&self, _playback_region: PlaybackRegionRef) -> PlaybackRegionHeadAndTailTime {
        PlaybackRegionHeadAndTailTime {
            head_time: 0.25,
            tail_time: 1.5,
        }
    }

    fn destroy_playback_region(&self, _playback_region: PlaybackRegionRef) {}

    fn is_audio_source_content_available(&self, _audio_source: AudioSourceRef, content_type: ContentType) -> bool {
        content_type == ContentType::KeySignatures
    }

    fn get_audio_source_content_grade(&self, _audio_source: AudioSourceRef, _content_type: ContentType) -> ContentGrade {
        ContentGrade::Detected
    }

    fn create_audio_source_content_reader(
        &self,
        _audio_source: AudioSourceRef,
        content_type: ContentType,
        _range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderRef> {
        (content_type == ContentType::KeySignatures).then(|| ContentReaderRef(self.issue()))
    }

    fn is_audio_modification_content_available(&self, _audio_modification: AudioModificationRef, _content_type: ContentType) -> bool {
        false
    }

    fn get_audio_modification_content_grade(&self, _audio_modification: AudioModificationRef, _content_type: ContentType) -> ContentGrade {
        ContentGrade::Initial
    }

    fn create_audio_modification_content_reader(
        &self,
        _audio_modification: AudioModificationRef,
        _content_type: ContentType,
        _range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderRef> {
        None
    }

    fn is_playback_region_content_available(&self, _playback_region: PlaybackRegionRef, _content_type: ContentType) -> bool {
        false
    }

    fn get_playback_region_content_grade(&self, _playback_region: PlaybackRegionRef, _content_type: ContentType) -> ContentGrade {
        ContentGrade::Initial
    }

    fn create_playback_region_content_reader(
        &self,
        _playback_region: PlaybackRegionRef,
        _content_type: ContentType,
        _range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderRef> {
        None
    }

    fn get_content_reader_event_count(&self, _reader: ContentReaderRef) -> i32 {
        1
    }

    fn get_content_reader_data_for_event(&self, _reader: ContentReaderRef, event_index: i32) -> Option<ContentEvent> {
        (event_index == 0).then(|| {
            ContentEvent::KeySignature(KeySignature {
                root: 7,
                intervals: [1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 0, 1],
                name: Some("G major".into()),
                position: 0.0,
            })
        })
    }

    fn destroy_content_reader(&self, reader: ContentReaderRef) {
        self.record(format!("destroy_content_reader {}", reader.bits()));
    }

    fn get_processing_algorithms_count(&self) -> i32 {
        2
    }
}

/// A plug-in instance that takes on the playback renderer role only.
#[derive(Default)]
pub(crate) struct RecordingExtension {
    pub(crate) renderer: Arc<RecordingRenderer>,
}

impl PlugInExtension for RecordingExtension {
    fn bind_to_document_controller(
        &self,
        _controller: &Arc<dyn DocumentController>,
        _known_roles: PlugInRoles,
        assigned_roles: PlugInRoles,
    ) -> BoundRoles {
        BoundRoles {
            playback_renderer: assigned_roles
                .contains(PlugInRoles::PLAYBACK_RENDERER)
                .then(|| self.renderer.clone() as Arc<dyn PlaybackRenderer>),
            ..Default::default()
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub(crate) regions: Mutex<Vec<PlaybackRegionRef>>,
}

impl PlaybackRenderer for RecordingRenderer {
    fn add_playback_region(&self, playback_region: PlaybackRegionRef) {
        self.regions.lock().push(playback_region);
    }

    fn remove_playback_region(&self, playback_region: PlaybackRegionRef) {
        self.regions.lock().retain(|r| *r != playback_region);
    }
}
