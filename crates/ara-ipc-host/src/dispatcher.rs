//! Host callback dispatcher.
//!
//! Every host callback carries the document controller host ref as its first
//! argument. The dispatcher resolves it, validates any audio source refs the
//! plug-in sends back, and forwards the call to that controller's host
//! interfaces. Audio and content readers the plug-in opens get a shadow entry
//! that lives until the matching destroy call.

use crate::document_controller::ControllerShared;
use crate::session::SessionState;
use ara_ipc_core::codec::{decode, encode};
use ara_ipc_core::content::encode_content_event_as;
use ara_ipc_core::model::{
    AnalysisProgressState, ContentTimeRange, ContentUpdateFlags, SampleBlock, SampleFormat,
};
use ara_ipc_core::refs::{
    ArchiveReaderHostRef, ArchiveWriterHostRef, AudioModificationHostRef, AudioReaderHostRef,
    AudioSourceHostRef, ContentReaderHostRef, DocumentControllerHostRef, MusicalContextHostRef,
    PlaybackRegionHostRef,
};
use ara_ipc_core::{
    AraBool, ContentType, Dispatch, Handle, Interface, IpcError, ObjectKind, Result, Selector,
};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Bytes an encoded `Option<Vec<u8>>` adds around the archive data.
const ARCHIVE_READ_OVERHEAD: usize = 16;

/// Shadow of an audio reader the plug-in opened.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HostAudioReader {
    /// Reader ref issued by the app.
    pub(crate) host_ref: AudioReaderHostRef,
    pub(crate) audio_source: Handle,
    pub(crate) channel_count: usize,
    pub(crate) format: SampleFormat,
}

/// Shadow of a host content reader the plug-in opened.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HostContentReader {
    pub(crate) host_ref: ContentReaderHostRef,
    pub(crate) content_type: ContentType,
}

pub(crate) struct HostDispatcher {
    state: Weak<SessionState>,
}

fn missing(interface: &str) -> IpcError {
    IpcError::InvalidState(format!("host provides no {interface} interface"))
}

impl HostDispatcher {
    pub(crate) fn new(state: Weak<SessionState>) -> Self {
        Self { state }
    }

    fn session(&self) -> Result<Arc<SessionState>> {
        self.state
            .upgrade()
            .ok_or_else(|| IpcError::InvalidState("host session closed".into()))
    }

    fn controller(&self, host_ref: DocumentControllerHostRef) -> Result<Arc<ControllerShared>> {
        self.session()?.controller(host_ref)
    }

    fn max_payload_size(&self) -> Result<usize> {
        Ok(self.session()?.max_payload_size)
    }
}

impl ControllerShared {
    /// Map an audio source ref sent by the plug-in back to the app's ref.
    fn app_audio_source(&self, audio_source: AudioSourceHostRef) -> Result<AudioSourceHostRef> {
        Ok(self.objects.lock().audio_sources.lookup(audio_source.bits())?.host_ref)
    }
}

impl Dispatch for HostDispatcher {
    fn dispatch(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        debug!(%selector, "host callback");
        match selector.interface() {
            Interface::AudioAccess => self.audio_access(selector, payload),
            Interface::Archiving => self.archiving(selector, payload),
            Interface::ContentAccess => self.content_access(selector, payload),
            Interface::ModelUpdate => self.model_update(selector, payload),
            Interface::PlaybackController => self.playback(selector, payload),
            // Plug-in side selectors never arrive at the host.
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }
}

impl HostDispatcher {
    fn audio_access(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::CreateAudioReaderForSource => {
                let (controller, audio_source, use_64_bit): (DocumentControllerHostRef, AudioSourceHostRef, AraBool) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let (source_handle, app_source, channel_count) = {
                    let objects = controller.objects.lock();
                    let handle = objects.audio_sources.resolve(audio_source.bits())?;
                    let record = objects
                        .audio_sources
                        .get(handle)
                        .expect("BUG: resolved handle must have a value");
                    (handle, record.host_ref, record.channel_count)
                };

                let created = controller
                    .interfaces
                    .audio_access
                    .create_audio_reader_for_source(app_source, use_64_bit.into());
                let reader = created.map(|host_ref| {
                    let handle = controller.objects.lock().audio_readers.insert(HostAudioReader {
                        host_ref,
                        audio_source: source_handle,
                        channel_count: channel_count.max(0) as usize,
                        format: SampleFormat::from_merits_64_bit(use_64_bit.into()),
                    });
                    AudioReaderHostRef(handle.to_bits())
                });
                encode(&reader)
            }
            Selector::ReadAudioSamples => {
                let (controller, reader, sample_position, samples_per_channel): (
                    DocumentControllerHostRef,
                    AudioReaderHostRef,
                    i64,
                    i64,
                ) = decode(payload)?;
                let controller = self.controller(controller)?;
                let shadow = {
                    let objects = controller.objects.lock();
                    let shadow = *objects.audio_readers.lookup(reader.bits())?;
                    // Readers do not outlive their audio source.
                    if !objects.audio_sources.is_valid(shadow.audio_source) {
                        return Err(IpcError::StaleHandle {
                            kind: ObjectKind::AudioSource,
                            handle: shadow.audio_source.to_bits(),
                        });
                    }
                    shadow
                };
                let frames = usize::try_from(samples_per_channel).map_err(|_| {
                    IpcError::InvalidArgument(format!("invalid sample count {samples_per_channel}"))
                })?;
                let size = SampleBlock::encoded_size(shadow.format, shadow.channel_count, frames);
                let limit = self.max_payload_size()?;
                if !size.is_some_and(|size| size <= limit) {
                    warn!(
                        reader = reader.bits(),
                        samples_per_channel,
                        channels = shadow.channel_count,
                        limit,
                        "sample read does not fit in one reply"
                    );
                    return encode(&Option::<SampleBlock>::None);
                }

                let mut block = SampleBlock::zeroed(shadow.format, shadow.channel_count, frames)?;
                let ok = block.with_buffers(shadow.channel_count, |buffers| {
                    controller.interfaces.audio_access.read_audio_samples(
                        shadow.host_ref,
                        sample_position,
                        samples_per_channel,
                        buffers,
                    )
                });
                encode(&ok.then_some(block))
            }
            Selector::DestroyAudioReader => {
                let (controller, reader): (DocumentControllerHostRef, AudioReaderHostRef) = decode(payload)?;
                let controller = self.controller(controller)?;
                let shadow = controller.objects.lock().audio_readers.take(reader.bits())?;
                controller.interfaces.audio_access.destroy_audio_reader(shadow.host_ref);
                encode(&())
            }
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }

    fn archiving(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::GetArchiveSize => {
                let (controller, reader): (DocumentControllerHostRef, ArchiveReaderHostRef) = decode(payload)?;
                let controller = self.controller(controller)?;
                encode(&controller.interfaces.archiving.get_archive_size(reader))
            }
            Selector::ReadBytesFromArchive => {
                let (controller, reader, position, length): (DocumentControllerHostRef, ArchiveReaderHostRef, u64, u64) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let limit = self.max_payload_size()?;
                let Some(length) = usize::try_from(length)
                    .ok()
                    .filter(|length| length.saturating_add(ARCHIVE_READ_OVERHEAD) <= limit)
                else {
                    warn!(length, limit, "archive read does not fit in one reply");
                    return encode(&Option::<Vec<u8>>::None);
                };
                let mut buffer = vec![0u8; length];
                let ok = controller
                    .interfaces
                    .archiving
                    .read_bytes_from_archive(reader, position, &mut buffer);
                encode(&ok.then_some(buffer))
            }
            Selector::WriteBytesToArchive => {
                let (controller, writer, position, data): (DocumentControllerHostRef, ArchiveWriterHostRef, u64, Vec<u8>) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let ok = controller
                    .interfaces
                    .archiving
                    .write_bytes_to_archive(writer, position, &data);
                encode(&AraBool(ok))
            }
            Selector::NotifyDocumentArchivingProgress => {
                let (controller, value): (DocumentControllerHostRef, f32) = decode(payload)?;
                let controller = self.controller(controller)?;
                controller.interfaces.archiving.notify_document_archiving_progress(value);
                Ok(Vec::new())
            }
            Selector::NotifyDocumentUnarchivingProgress => {
                let (controller, value): (DocumentControllerHostRef, f32) = decode(payload)?;
                let controller = self.controller(controller)?;
                controller.interfaces.archiving.notify_document_unarchiving_progress(value);
                Ok(Vec::new())
            }
            Selector::GetDocumentArchiveId => {
                let (controller, reader): (DocumentControllerHostRef, ArchiveReaderHostRef) = decode(payload)?;
                let controller = self.controller(controller)?;
                encode(&controller.interfaces.archiving.get_document_archive_id(reader))
            }
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }

    fn register_host_content_reader(
        controller: &ControllerShared,
        created: Option<ContentReaderHostRef>,
        content_type: ContentType,
    ) -> Option<ContentReaderHostRef> {
        created.map(|host_ref| {
            let handle = controller
                .objects
                .lock()
                .host_content_readers
                .insert(HostContentReader { host_ref, content_type });
            ContentReaderHostRef(handle.to_bits())
        })
    }

    fn content_access(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::HostIsMusicalContextContentAvailable => {
                let (controller, context, content_type): (DocumentControllerHostRef, MusicalContextHostRef, ContentType) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let access = controller.interfaces.content_access.as_ref().ok_or_else(|| missing("content access"))?;
                encode(&AraBool(access.is_musical_context_content_available(context, content_type)))
            }
            Selector::HostGetMusicalContextContentGrade => {
                let (controller, context, content_type): (DocumentControllerHostRef, MusicalContextHostRef, ContentType) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let access = controller.interfaces.content_access.as_ref().ok_or_else(|| missing("content access"))?;
                encode(&access.get_musical_context_content_grade(context, content_type))
            }
            Selector::HostCreateMusicalContextContentReader => {
                let (controller, context, content_type, range): (
                    DocumentControllerHostRef,
                    MusicalContextHostRef,
                    ContentType,
                    Option<ContentTimeRange>,
                ) = decode(payload)?;
                let controller = self.controller(controller)?;
                let access = controller.interfaces.content_access.clone().ok_or_else(|| missing("content access"))?;
                let created = access.create_musical_context_content_reader(context, content_type, range);
                encode(&Self::register_host_content_reader(&controller, created, content_type))
            }
            Selector::HostIsAudioSourceContentAvailable => {
                let (controller, audio_source, content_type): (DocumentControllerHostRef, AudioSourceHostRef, ContentType) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let audio_source = controller.app_audio_source(audio_source)?;
                let access = controller.interfaces.content_access.as_ref().ok_or_else(|| missing("content access"))?;
                encode(&AraBool(access.is_audio_source_content_available(audio_source, content_type)))
            }
            Selector::HostGetAudioSourceContentGrade => {
                let (controller, audio_source, content_type): (DocumentControllerHostRef, AudioSourceHostRef, ContentType) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let audio_source = controller.app_audio_source(audio_source)?;
                let access = controller.interfaces.content_access.as_ref().ok_or_else(|| missing("content access"))?;
                encode(&access.get_audio_source_content_grade(audio_source, content_type))
            }
            Selector::HostCreateAudioSourceContentReader => {
                let (controller, audio_source, content_type, range): (
                    DocumentControllerHostRef,
                    AudioSourceHostRef,
                    ContentType,
                    Option<ContentTimeRange>,
                ) = decode(payload)?;
                let controller = self.controller(controller)?;
                let audio_source = controller.app_audio_source(audio_source)?;
                let access = controller.interfaces.content_access.clone().ok_or_else(|| missing("content access"))?;
                let created = access.create_audio_source_content_reader(audio_source, content_type, range);
                encode(&Self::register_host_content_reader(&controller, created, content_type))
            }
            Selector::HostGetContentReaderEventCount => {
                let (controller, reader): (DocumentControllerHostRef, ContentReaderHostRef) = decode(payload)?;
                let controller = self.controller(controller)?;
                let shadow = *controller.objects.lock().host_content_readers.lookup(reader.bits())?;
                let access = controller.interfaces.content_access.as_ref().ok_or_else(|| missing("content access"))?;
                encode(&access.get_content_reader_event_count(shadow.host_ref))
            }
            Selector::HostGetContentReaderDataForEvent => {
                let (controller, reader, event_index): (DocumentControllerHostRef, ContentReaderHostRef, i32) =
                    decode(payload)?;
                let controller = self.controller(controller)?;
                let shadow = *controller.objects.lock().host_content_readers.lookup(reader.bits())?;
                let access = controller.interfaces.content_access.as_ref().ok_or_else(|| missing("content access"))?;
                let data = access
                    .get_content_reader_data_for_event(shadow.host_ref, event_index)
                    .map(|event| encode_content_event_as(shadow.content_type, &event))
                    .transpose()?;
                encode(&data)
            }
            Selector::HostDestroyContentReader => {
                let (controller, reader): (DocumentControllerHostRef, ContentReaderHostRef) = decode(payload)?;
                let controller = self.controller(controller)?;
                let shadow = controller.objects.lock().host_content_readers.take(reader.bits())?;
                if let Some(access) = controller.interfaces.content_access.as_ref() {
                    access.destroy_content_reader(shadow.host_ref);
                }
                encode(&())
            }
            _ => Err(IpcError::UnknownSelector(selector as u32)),
        }
    }

    fn model_update(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::NotifyAudioSourceAnalysisProgress => {
                let (controller, audio_source, state, value): (
                    DocumentControllerHostRef,
                    AudioSourceHostRef,
                    AnalysisProgressState,
                    f32,
                ) = decode(payload)?;
                let controller = self.controller(controller)?;
                let audio_source = controller.app_audio_source(audio_source)?;
                let updates = controller.interfaces.model_update.as_ref().ok_or_else(|| missing("model update"))?;
                updates.notify_audio_source_analysis_progress(audio_source, state, value);
            }
            Selector::NotifyAudioSourceContentChanged => {
                let (controller, audio_source, range, flags): (
                    DocumentControllerHostRef,
                    AudioSourceHostRef,
                    Option<ContentTimeRange>,
                    ContentUpdateFlags,
                ) = decode(payload)?;
                let controller = self.controller(controller)?;
                let audio_source = controller.app_audio_source(audio_source)?;
                let updates = controller.interfaces.model_update.as_ref().ok_or_else(|| missing("model update"))?;
                updates.notify_audio_source_content_changed(audio_source, range, flags);
            }
            Selector::NotifyAudioModificationContentChanged => {
                let (controller, audio_modification, range, flags): (
                    DocumentControllerHostRef,
                    AudioModificationHostRef,
                    Option<ContentTimeRange>,
                    ContentUpdateFlags,
                ) = decode(payload)?;
                let controller = self.controller(controller)?;
                let updates = controller.interfaces.model_update.as_ref().ok_or_else(|| missing("model update"))?;
                updates.notify_audio_modification_content_changed(audio_modification, range, flags);
            }
            Selector::NotifyPlaybackRegionContentChanged => {
                let (controller, playback_region, range, flags): (
                    DocumentControllerHostRef,
                    PlaybackRegionHostRef,
                    Option<ContentTimeRange>,
                    ContentUpdateFlags,
                ) = decode(payload)?;
                let controller = self.controller(controller)?;
                let updates = controller.interfaces.model_update.as_ref().ok_or_else(|| missing("model update"))?;
                updates.notify_playback_region_content_changed(playback_region, range, flags);
            }
            Selector::NotifyDocumentDataChanged => {
                let controller: DocumentControllerHostRef = decode(payload)?;
                let controller = self.controller(controller)?;
                let updates = controller.interfaces.model_update.as_ref().ok_or_else(|| missing("model update"))?;
                updates.notify_document_data_changed();
            }
            _ => return Err(IpcError::UnknownSelector(selector as u32)),
        }
        Ok(Vec::new())
    }

    fn playback(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        match selector {
            Selector::RequestStartPlayback => {
                let controller: DocumentControllerHostRef = decode(payload)?;
                let controller = self.controller(controller)?;
                let playback = controller.interfaces.playback.as_ref().ok_or_else(|| missing("playback"))?;
                playback.request_start_playback();
            }
            Selector::RequestStopPlayback => {
                let controller: DocumentControllerHostRef = decode(payload)?;
                let controller = self.controller(controller)?;
                let playback = controller.interfaces.playback.as_ref().ok_or_else(|| missing("playback"))?;
                playback.request_stop_playback();
            }
            Selector::RequestSetPlaybackPosition => {
                let (controller, time_position): (DocumentControllerHostRef, f64) = decode(payload)?;
                let controller = self.controller(controller)?;
                let playback = controller.interfaces.playback.as_ref().ok_or_else(|| missing("playback"))?;
                playback.request_set_playback_position(time_position);
            }
            Selector::RequestSetCycleRange => {
                let (controller, start_time, duration): (DocumentControllerHostRef, f64, f64) = decode(payload)?;
                let controller = self.controller(controller)?;
                let playback = controller.interfaces.playback.as_ref().ok_or_else(|| missing("playback"))?;
                playback.request_set_cycle_range(start_time, duration);
            }
            Selector::RequestEnableCycle => {
                let (controller, enable): (DocumentControllerHostRef, AraBool) = decode(payload)?;
                let controller = self.controller(controller)?;
                let playback = controller.interfaces.playback.as_ref().ok_or_else(|| missing("playback"))?;
                playback.request_enable_cycle(enable.into());
            }
            _ => return Err(IpcError::UnknownSelector(selector as u32)),
        }
        Ok(Vec::new())
    }
}
