//! Host-side controller interfaces.
//!
//! The host application implements these per document controller. In the
//! plug-in process they are implemented by proxies that forward each call to
//! the host process.

use crate::content::{ContentEvent, ContentType};
use crate::model::{
    AnalysisProgressState, ContentGrade, ContentTimeRange, ContentUpdateFlags, SampleBuffers,
};
use crate::protocol::HostInterfacePresence;
use crate::refs::{
    ArchiveReaderHostRef, ArchiveWriterHostRef, AudioModificationHostRef, AudioReaderHostRef,
    AudioSourceHostRef, ContentReaderHostRef, MusicalContextHostRef, PlaybackRegionHostRef,
};
use std::sync::Arc;

/// Sample access for audio sources.
pub trait AudioAccessController: Send + Sync {
    fn create_audio_reader_for_source(
        &self,
        audio_source: AudioSourceHostRef,
        use_64_bit_samples: bool,
    ) -> Option<AudioReaderHostRef>;

    /// Fill `buffers` with `samples_per_channel` samples per channel.
    ///
    /// On failure the buffer contents are whatever the reader left there.
    fn read_audio_samples(
        &self,
        reader: AudioReaderHostRef,
        sample_position: i64,
        samples_per_channel: i64,
        buffers: SampleBuffers<'_, '_>,
    ) -> bool;

    fn destroy_audio_reader(&self, reader: AudioReaderHostRef);
}

pub trait ArchivingController: Send + Sync {
    fn get_archive_size(&self, reader: ArchiveReaderHostRef) -> u64;

    /// Fill all of `buffer` starting at `position`.
    fn read_bytes_from_archive(&self, reader: ArchiveReaderHostRef, position: u64, buffer: &mut [u8]) -> bool;

    fn write_bytes_to_archive(&self, writer: ArchiveWriterHostRef, position: u64, data: &[u8]) -> bool;

    fn notify_document_archiving_progress(&self, value: f32);

    fn notify_document_unarchiving_progress(&self, value: f32);

    fn get_document_archive_id(&self, reader: ArchiveReaderHostRef) -> Option<String>;
}

/// Content the host itself knows about (tempo maps, chords, ...).
pub trait ContentAccessController: Send + Sync {
    fn is_musical_context_content_available(
        &self,
        musical_context: MusicalContextHostRef,
        content_type: ContentType,
    ) -> bool;

    fn get_musical_context_content_grade(
        &self,
        musical_context: MusicalContextHostRef,
        content_type: ContentType,
    ) -> ContentGrade;

    fn create_musical_context_content_reader(
        &self,
        musical_context: MusicalContextHostRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderHostRef>;

    fn is_audio_source_content_available(&self, audio_source: AudioSourceHostRef, content_type: ContentType) -> bool;

    fn get_audio_source_content_grade(&self, audio_source: AudioSourceHostRef, content_type: ContentType) -> ContentGrade;

    fn create_audio_source_content_reader(
        &self,
        audio_source: AudioSourceHostRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderHostRef>;

    fn get_content_reader_event_count(&self, reader: ContentReaderHostRef) -> i32;

    fn get_content_reader_data_for_event(&self, reader: ContentReaderHostRef, event_index: i32) -> Option<ContentEvent>;

    fn destroy_content_reader(&self, reader: ContentReaderHostRef);
}

pub trait ModelUpdateController: Send + Sync {
    fn notify_audio_source_analysis_progress(
        &self,
        audio_source: AudioSourceHostRef,
        state: AnalysisProgressState,
        value: f32,
    );

    fn notify_audio_source_content_changed(
        &self,
        audio_source: AudioSourceHostRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    );

    fn notify_audio_modification_content_changed(
        &self,
        audio_modification: AudioModificationHostRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    );

    fn notify_playback_region_content_changed(
        &self,
        playback_region: PlaybackRegionHostRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    );

    fn notify_document_data_changed(&self);
}

/// Transport requests from the plug-in's UI.
pub trait PlaybackController: Send + Sync {
    fn request_start_playback(&self);
    fn request_stop_playback(&self);
    fn request_set_playback_position(&self, time_position: f64);
    fn request_set_cycle_range(&self, start_time: f64, duration: f64);
    fn request_enable_cycle(&self, enable: bool);
}

/// The host interfaces handed to one document controller.
///
/// Audio access and archiving are mandatory.
#[derive(Clone)]
pub struct HostInterfaces {
    pub audio_access: Arc<dyn AudioAccessController>,
    pub archiving: Arc<dyn ArchivingController>,
    pub content_access: Option<Arc<dyn ContentAccessController>>,
    pub model_update: Option<Arc<dyn ModelUpdateController>>,
    pub playback: Option<Arc<dyn PlaybackController>>,
}

impl HostInterfaces {
    pub fn new(
        audio_access: Arc<dyn AudioAccessController>,
        archiving: Arc<dyn ArchivingController>,
    ) -> Self {
        Self {
            audio_access,
            archiving,
            content_access: None,
            model_update: None,
            playback: None,
        }
    }

    pub fn with_content_access(mut self, content_access: Arc<dyn ContentAccessController>) -> Self {
        self.content_access = Some(content_access);
        self
    }

    pub fn with_model_update(mut self, model_update: Arc<dyn ModelUpdateController>) -> Self {
        self.model_update = Some(model_update);
        self
    }

    pub fn with_playback(mut self, playback: Arc<dyn PlaybackController>) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn presence(&self) -> HostInterfacePresence {
        HostInterfacePresence {
            content_access: self.content_access.is_some(),
            model_update: self.model_update.is_some(),
            playback: self.playback.is_some(),
        }
    }
}

impl std::fmt::Debug for HostInterfaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostInterfaces")
            .field("presence", &self.presence())
            .finish_non_exhaustive()
    }
}
