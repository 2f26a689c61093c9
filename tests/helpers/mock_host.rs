//! Host application stand-in.
//!
//! Holds per-source sample data, one in-memory archive and a fixed tempo map
//! for every musical context. Notifications from the plug-in are recorded as
//! strings in arrival order.

use ara_ipc::api::{
    ArchivingController, AudioAccessController, ContentAccessController, HostInterfaces, ModelUpdateController,
    PlaybackController,
};
use ara_ipc::core::content::TempoEntry;
use ara_ipc::model::{AnalysisProgressState, ContentGrade, ContentTimeRange, ContentUpdateFlags, SampleBuffers};
use ara_ipc::refs::{
    ArchiveReaderHostRef, ArchiveWriterHostRef, AudioModificationHostRef, AudioReaderHostRef, AudioSourceHostRef,
    ContentReaderHostRef, MusicalContextHostRef, PlaybackRegionHostRef,
};
use ara_ipc::{ContentEvent, ContentType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub const ARCHIVE_READER: ArchiveReaderHostRef = ArchiveReaderHostRef(1);
pub const ARCHIVE_WRITER: ArchiveWriterHostRef = ArchiveWriterHostRef(1);
pub const HOST_ARCHIVE_ID: &str = "com.example.mock.document";

/// Called at the top of every sample read.
pub type ReadHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct MockHost {
    sources: Mutex<HashMap<AudioSourceHostRef, Vec<Vec<f64>>>>,
    readers: Mutex<HashMap<AudioReaderHostRef, AudioSourceHostRef>>,
    content_readers: Mutex<HashMap<ContentReaderHostRef, Vec<ContentEvent>>>,
    next_ref: AtomicU64,
    archive: Mutex<Vec<u8>>,
    fail_reads: AtomicBool,
    notifications: Mutex<Vec<String>>,
    read_hook: Mutex<Option<ReadHook>>,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_ref: AtomicU64::new(100),
            ..Default::default()
        })
    }

    /// Every host interface, all backed by this host.
    pub fn interfaces(self: &Arc<Self>) -> HostInterfaces {
        HostInterfaces::new(self.clone(), self.clone())
            .with_content_access(self.clone())
            .with_model_update(self.clone())
            .with_playback(self.clone())
    }

    /// Channel `c`, frame `i` holds `c + i / 1000`.
    pub fn add_ramp_source(&self, host_ref: AudioSourceHostRef, channel_count: usize, frames: usize) {
        let channels = (0..channel_count)
            .map(|c| (0..frames).map(|i| c as f64 + i as f64 / 1000.0).collect())
            .collect();
        self.sources.lock().insert(host_ref, channels);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_read_hook(&self, hook: Option<ReadHook>) {
        *self.read_hook.lock() = hook;
    }

    pub fn open_audio_readers(&self) -> usize {
        self.readers.lock().len()
    }

    pub fn open_content_readers(&self) -> usize {
        self.content_readers.lock().len()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().clone()
    }

    pub fn archive(&self) -> Vec<u8> {
        self.archive.lock().clone()
    }

    fn record(&self, notification: impl Into<String>) {
        self.notifications.lock().push(notification.into());
    }

    fn issue(&self) -> u64 {
        self.next_ref.fetch_add(1, Ordering::Relaxed)
    }
}

fn fill<T>(
    out: &mut [&mut [T]],
    data: &[Vec<f64>],
    position: usize,
    frames: usize,
    convert: impl Fn(f64) -> T,
) -> bool {
    if out.len() != data.len() || data.iter().any(|channel| channel.len() < position + frames) {
        return false;
    }
    for (target, source) in out.iter_mut().zip(data) {
        for (sample, value) in target[..frames].iter_mut().zip(&source[position..position + frames]) {
            *sample = convert(*value);
        }
    }
    true
}

impl AudioAccessController for MockHost {
    fn create_audio_reader_for_source(
        &self,
        audio_source: AudioSourceHostRef,
        _use_64_bit_samples: bool,
    ) -> Option<AudioReaderHostRef> {
        if !self.sources.lock().contains_key(&audio_source) {
            return None;
        }
        let reader = AudioReaderHostRef(self.issue());
        self.readers.lock().insert(reader, audio_source);
        Some(reader)
    }

    fn read_audio_samples(
        &self,
        reader: AudioReaderHostRef,
        sample_position: i64,
        samples_per_channel: i64,
        buffers: SampleBuffers<'_, '_>,
    ) -> bool {
        if let Some(hook) = self.read_hook.lock().as_ref() {
            hook();
        }
        if self.fail_reads.load(Ordering::SeqCst) || sample_position < 0 || samples_per_channel < 0 {
            return false;
        }
        let Some(source) = self.readers.lock().get(&reader).copied() else {
            return false;
        };
        let sources = self.sources.lock();
        let Some(data) = sources.get(&source) else {
            return false;
        };
        let (position, frames) = (sample_position as usize, samples_per_channel as usize);
        match buffers {
            SampleBuffers::Float32(channels) => fill(channels, data, position, frames, |v| v as f32),
            SampleBuffers::Float64(channels) => fill(channels, data, position, frames, |v| v),
        }
    }

    fn destroy_audio_reader(&self, reader: AudioReaderHostRef) {
        self.readers.lock().remove(&reader);
    }
}

impl ArchivingController for MockHost {
    fn get_archive_size(&self, _reader: ArchiveReaderHostRef) -> u64 {
        self.archive.lock().len() as u64
    }

    fn read_bytes_from_archive(&self, _reader: ArchiveReaderHostRef, position: u64, buffer: &mut [u8]) -> bool {
        let archive = self.archive.lock();
        let start = position as usize;
        match archive.get(start..start + buffer.len()) {
            Some(bytes) => {
                buffer.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    fn write_bytes_to_archive(&self, _writer: ArchiveWriterHostRef, position: u64, data: &[u8]) -> bool {
        let mut archive = self.archive.lock();
        let start = position as usize;
        if archive.len() < start + data.len() {
            archive.resize(start + data.len(), 0);
        }
        archive[start..start + data.len()].copy_from_slice(data);
        true
    }

    fn notify_document_archiving_progress(&self, value: f32) {
        self.record(format!("archiving {value}"));
    }

    fn notify_document_unarchiving_progress(&self, value: f32) {
        self.record(format!("unarchiving {value}"));
    }

    fn get_document_archive_id(&self, _reader: ArchiveReaderHostRef) -> Option<String> {
        Some(HOST_ARCHIVE_ID.to_string())
    }
}

impl ContentAccessController for MockHost {
    fn is_musical_context_content_available(
        &self,
        _musical_context: MusicalContextHostRef,
        content_type: ContentType,
    ) -> bool {
        content_type == ContentType::TempoEntries
    }

    fn get_musical_context_content_grade(
        &self,
        _musical_context: MusicalContextHostRef,
        content_type: ContentType,
    ) -> ContentGrade {
        if content_type == ContentType::TempoEntries {
            ContentGrade::Approved
        } else {
            ContentGrade::Initial
        }
    }

    fn create_musical_context_content_reader(
        &self,
        _musical_context: MusicalContextHostRef,
        content_type: ContentType,
        _range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderHostRef> {
        if content_type != ContentType::TempoEntries {
            return None;
        }
        // 120 bpm
        let events = vec![
            ContentEvent::Tempo(TempoEntry {
                time_position: 0.0,
                quarter_position: 0.0,
            }),
            ContentEvent::Tempo(TempoEntry {
                time_position: 0.5,
                quarter_position: 1.0,
            }),
        ];
        let reader = ContentReaderHostRef(self.issue());
        self.content_readers.lock().insert(reader, events);
        Some(reader)
    }

    fn is_audio_source_content_available(&self, _audio_source: AudioSourceHostRef, _content_type: ContentType) -> bool {
        false
    }

    fn get_audio_source_content_grade(&self, _audio_source: AudioSourceHostRef, _content_type: ContentType) -> ContentGrade {
        ContentGrade::Initial
    }

    fn create_audio_source_content_reader(
        &self,
        _audio_source: AudioSourceHostRef,
        _content_type: ContentType,
        _range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderHostRef> {
        None
    }

    fn get_content_reader_event_count(&self, reader: ContentReaderHostRef) -> i32 {
        self.content_readers
            .lock()
            .get(&reader)
            .map_or(0, |events| events.len() as i32)
    }

    fn get_content_reader_data_for_event(&self, reader: ContentReaderHostRef, event_index: i32) -> Option<ContentEvent> {
        let readers = self.content_readers.lock();
        let index = usize::try_from(event_index).ok()?;
        readers.get(&reader)?.get(index).cloned()
    }

    fn destroy_content_reader(&self, reader: ContentReaderHostRef) {
        self.content_readers.lock().remove(&reader);
    }
}

impl ModelUpdateController for MockHost {
    fn notify_audio_source_analysis_progress(
        &self,
        audio_source: AudioSourceHostRef,
        state: AnalysisProgressState,
        _value: f32,
    ) {
        self.record(format!("analysis {} {state:?}", audio_source.bits()));
    }

    fn notify_audio_source_content_changed(
        &self,
        audio_source: AudioSourceHostRef,
        _range: Option<ContentTimeRange>,
        _flags: ContentUpdateFlags,
    ) {
        self.record(format!("audio source content changed {}", audio_source.bits()));
    }

    fn notify_audio_modification_content_changed(
        &self,
        audio_modification: AudioModificationHostRef,
        _range: Option<ContentTimeRange>,
        _flags: ContentUpdateFlags,
    ) {
        self.record(format!("audio modification content changed {}", audio_modification.bits()));
    }

    fn notify_playback_region_content_changed(
        &self,
        playback_region: PlaybackRegionHostRef,
        _range: Option<ContentTimeRange>,
        _flags: ContentUpdateFlags,
    ) {
        self.record(format!("playback region content changed {}", playback_region.bits()));
    }

    fn notify_document_data_changed(&self) {
        self.record("document data changed");
    }
}

impl PlaybackController for MockHost {
    fn request_start_playback(&self) {
        self.record("start playback");
    }

    fn request_stop_playback(&self) {
        self.record("stop playback");
    }

    fn request_set_playback_position(&self, time_position: f64) {
        self.record(format!("playback position {time_position}"));
    }

    fn request_set_cycle_range(&self, start_time: f64, duration: f64) {
        self.record(format!("cycle range {start_time} {duration}"));
    }

    fn request_enable_cycle(&self, enable: bool) {
        self.record(format!("enable cycle {enable}"));
    }
}
