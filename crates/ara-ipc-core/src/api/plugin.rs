//! Plug-in-side interfaces.
//!
//! The plug-in implements these. In the host process the same operations are
//! reached through proxies, which return `Result` instead of plain values.

use super::host::HostInterfaces;
use crate::content::{ContentEvent, ContentType};
use crate::gate::RenderAccessGate;
use crate::model::{
    AudioFileChunk, AudioModificationProperties, AudioSourceProperties, ContentGrade,
    ContentTimeRange, ContentUpdateFlags, DocumentProperties, FactoryDescriptor,
    MusicalContextProperties, PlaybackRegionHeadAndTailTime, PlaybackRegionProperties,
    PlugInRoles, ProcessingAlgorithmProperties, RegionSequenceProperties, RestoreObjectsFilter,
    StoreObjectsFilter, ViewSelection,
};
use crate::refs::{
    ArchiveReaderHostRef, ArchiveWriterHostRef, AudioModificationHostRef, AudioModificationRef,
    AudioSourceHostRef, AudioSourceRef, ContentReaderRef, MusicalContextHostRef,
    MusicalContextRef, PlaybackRegionHostRef, PlaybackRegionRef, RegionSequenceHostRef,
    RegionSequenceRef,
};
use std::sync::Arc;

/// What a new document controller gets from its environment.
#[derive(Debug, Clone)]
pub struct PlugInHostContext {
    pub host: HostInterfaces,
    /// Renderers of this controller must enter this gate before touching the model.
    pub render_access: Arc<RenderAccessGate>,
}

pub trait PlugInFactory: Send + Sync {
    fn descriptor(&self) -> FactoryDescriptor;

    fn create_document_controller(
        &self,
        context: PlugInHostContext,
        properties: &DocumentProperties,
    ) -> Option<Arc<dyn DocumentController>>;
}

/// One document's model graph as maintained by the plug-in.
///
/// Model refs returned from the `create_*` methods are issued by the
/// implementation and only ever handed back to it.
pub trait DocumentController: Send + Sync {
    /// Called once before the controller is dropped.
    fn destroy_document_controller(&self) {}

    fn begin_editing(&self);
    fn end_editing(&self);
    fn notify_model_updates(&self);

    fn restore_objects_from_archive(
        &self,
        reader: ArchiveReaderHostRef,
        filter: Option<&RestoreObjectsFilter>,
    ) -> bool;

    fn store_objects_to_archive(&self, writer: ArchiveWriterHostRef, filter: Option<&StoreObjectsFilter>) -> bool;

    fn store_audio_source_to_audio_file_chunk(
        &self,
        _writer: ArchiveWriterHostRef,
        _audio_source: AudioSourceRef,
    ) -> Option<AudioFileChunk> {
        None
    }

    fn update_document_properties(&self, properties: &DocumentProperties);

    fn create_musical_context(
        &self,
        host_ref: MusicalContextHostRef,
        properties: &MusicalContextProperties,
    ) -> MusicalContextRef;
    fn update_musical_context_properties(&self, musical_context: MusicalContextRef, properties: &MusicalContextProperties);
    fn update_musical_context_content(
        &self,
        musical_context: MusicalContextRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    );
    fn destroy_musical_context(&self, musical_context: MusicalContextRef);

    fn create_region_sequence(
        &self,
        host_ref: RegionSequenceHostRef,
        properties: &RegionSequenceProperties,
    ) -> RegionSequenceRef;
    fn update_region_sequence_properties(&self, region_sequence: RegionSequenceRef, properties: &RegionSequenceProperties);
    fn destroy_region_sequence(&self, region_sequence: RegionSequenceRef);

    fn create_audio_source(&self, host_ref: AudioSourceHostRef, properties: &AudioSourceProperties) -> AudioSourceRef;
    fn update_audio_source_properties(&self, audio_source: AudioSourceRef, properties: &AudioSourceProperties);
    fn update_audio_source_content(
        &self,
        audio_source: AudioSourceRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    );
    fn enable_audio_source_samples_access(&self, audio_source: AudioSourceRef, enable: bool);
    fn deactivate_audio_source_for_undo_history(&self, audio_source: AudioSourceRef, deactivate: bool);
    fn destroy_audio_source(&self, audio_source: AudioSourceRef);

    fn create_audio_modification(
        &self,
        audio_source: AudioSourceRef,
        host_ref: AudioModificationHostRef,
        properties: &AudioModificationProperties,
    ) -> AudioModificationRef;
    fn clone_audio_modification(
        &self,
        source: AudioModificationRef,
        host_ref: AudioModificationHostRef,
        properties: &AudioModificationProperties,
    ) -> AudioModificationRef;
    fn update_audio_modification_properties(
        &self,
        audio_modification: AudioModificationRef,
        properties: &AudioModificationProperties,
    );
    fn is_audio_modification_preserving_audio_source_signal(&self, audio_modification: AudioModificationRef) -> bool;
    fn deactivate_audio_modification_for_undo_history(&self, audio_modification: AudioModificationRef, deactivate: bool);
    fn destroy_audio_modification(&self, audio_modification: AudioModificationRef);

    fn create_playback_region(
        &self,
        audio_modification: AudioModificationRef,
        host_ref: PlaybackRegionHostRef,
        properties: &PlaybackRegionProperties,
    ) -> PlaybackRegionRef;
    fn update_playback_region_properties(&self, playback_region: PlaybackRegionRef, properties: &PlaybackRegionProperties);
    fn get_playback_region_head_and_tail_time(&self, playback_region: PlaybackRegionRef) -> PlaybackRegionHeadAndTailTime;
    fn destroy_playback_region(&self, playback_region: PlaybackRegionRef);

    fn is_audio_source_content_available(&self, audio_source: AudioSourceRef, content_type: ContentType) -> bool;
    fn get_audio_source_content_grade(&self, audio_source: AudioSourceRef, content_type: ContentType) -> ContentGrade;
    fn create_audio_source_content_reader(
        &self,
        audio_source: AudioSourceRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderRef>;

    fn is_audio_modification_content_available(
        &self,
        audio_modification: AudioModificationRef,
        content_type: ContentType,
    ) -> bool;
    fn get_audio_modification_content_grade(
        &self,
        audio_modification: AudioModificationRef,
        content_type: ContentType,
    ) -> ContentGrade;
    fn create_audio_modification_content_reader(
        &self,
        audio_modification: AudioModificationRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderRef>;

    fn is_playback_region_content_available(&self, playback_region: PlaybackRegionRef, content_type: ContentType) -> bool;
    fn get_playback_region_content_grade(&self, playback_region: PlaybackRegionRef, content_type: ContentType) -> ContentGrade;
    fn create_playback_region_content_reader(
        &self,
        playback_region: PlaybackRegionRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderRef>;

    fn get_content_reader_event_count(&self, reader: ContentReaderRef) -> i32;
    fn get_content_reader_data_for_event(&self, reader: ContentReaderRef, event_index: i32) -> Option<ContentEvent>;
    fn destroy_content_reader(&self, reader: ContentReaderRef);

    fn is_audio_source_content_analysis_incomplete(&self, _audio_source: AudioSourceRef, _content_type: ContentType) -> bool {
        false
    }

    fn request_audio_source_content_analysis(&self, _audio_source: AudioSourceRef, _content_types: &[ContentType]) {}

    fn get_processing_algorithms_count(&self) -> i32 {
        0
    }

    fn get_processing_algorithm_properties(&self, _algorithm_index: i32) -> Option<ProcessingAlgorithmProperties> {
        None
    }

    fn get_processing_algorithm_for_audio_source(&self, _audio_source: AudioSourceRef) -> i32 {
        0
    }

    fn request_processing_algorithm_for_audio_source(&self, _audio_source: AudioSourceRef, _algorithm_index: i32) {}
}

pub trait PlaybackRenderer: Send + Sync {
    fn add_playback_region(&self, playback_region: PlaybackRegionRef);
    fn remove_playback_region(&self, playback_region: PlaybackRegionRef);
}

pub trait EditorRenderer: Send + Sync {
    fn add_playback_region(&self, playback_region: PlaybackRegionRef);
    fn remove_playback_region(&self, playback_region: PlaybackRegionRef);
    fn add_region_sequence(&self, region_sequence: RegionSequenceRef);
    fn remove_region_sequence(&self, region_sequence: RegionSequenceRef);
}

pub trait EditorView: Send + Sync {
    fn notify_selection(&self, selection: &ViewSelection);
    fn notify_hide_region_sequences(&self, region_sequences: &[RegionSequenceRef]);
}

/// Role objects a plug-in instance created while binding.
#[derive(Default, Clone)]
pub struct BoundRoles {
    pub playback_renderer: Option<Arc<dyn PlaybackRenderer>>,
    pub editor_renderer: Option<Arc<dyn EditorRenderer>>,
    pub editor_view: Option<Arc<dyn EditorView>>,
}

/// The per-instance entry point of a plug-in (one per loaded VST3/AU/CLAP instance).
pub trait PlugInExtension: Send + Sync {
    fn bind_to_document_controller(
        &self,
        controller: &Arc<dyn DocumentController>,
        known_roles: PlugInRoles,
        assigned_roles: PlugInRoles,
    ) -> BoundRoles;
}
