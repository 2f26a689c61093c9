//! Audio source proxies and the controller calls that take audio sources.
//!
//! The app addresses an audio source by its local handle, which is also the
//! `AudioSourceHostRef` the plug-in receives at creation. Calls translate the
//! handle to the plug-in's ref before sending.

use crate::document_controller::DocumentControllerProxy;
use ara_ipc_core::model::{
    AudioFileChunk, AudioModificationProperties, AudioSourceProperties, ContentTimeRange,
    ContentUpdateFlags, ProcessingAlgorithmProperties, StoreObjectsFilter,
};
use ara_ipc_core::refs::{
    ArchiveWriterHostRef, AudioModificationHostRef, AudioModificationRef, AudioSourceHostRef,
    AudioSourceRef,
};
use ara_ipc_core::{AraBool, ContentType, Handle, IpcError, ObjectKind, Result, Selector};
use tracing::debug;

/// Local record of a plug-in audio source.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AudioSourceProxy {
    /// The app's own ref, passed to host callbacks.
    pub(crate) host_ref: AudioSourceHostRef,
    pub(crate) remote: AudioSourceRef,
    pub(crate) channel_count: i32,
    pub(crate) sample_count: i64,
    pub(crate) sample_rate: f64,
}

impl AudioSourceProxy {
    fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.sample_count as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

impl DocumentControllerProxy {
    fn remote_audio_source(&self, audio_source: AudioSourceRef) -> Result<AudioSourceRef> {
        let objects = self.shared.objects.lock();
        Ok(objects.audio_sources.lookup(audio_source.bits())?.remote)
    }

    fn audio_source_record(&self, audio_source: AudioSourceRef) -> Result<AudioSourceProxy> {
        let objects = self.shared.objects.lock();
        Ok(*objects.audio_sources.lookup(audio_source.bits())?)
    }

    /// Whether `audio_source` is a live audio source of this controller.
    pub fn is_audio_source_valid(&self, audio_source: AudioSourceRef) -> bool {
        let objects = self.shared.objects.lock();
        objects.audio_sources.resolve(audio_source.bits()).is_ok()
    }

    pub fn audio_source_count(&self) -> usize {
        self.shared.objects.lock().audio_sources.len()
    }

    /// The plug-in's ref for a local audio source.
    pub fn audio_source_remote_ref(&self, audio_source: AudioSourceRef) -> Result<AudioSourceRef> {
        self.remote_audio_source(audio_source)
    }

    pub fn create_audio_source(
        &self,
        host_ref: AudioSourceHostRef,
        properties: &AudioSourceProperties,
    ) -> Result<AudioSourceRef> {
        if properties.channel_count <= 0 {
            return Err(IpcError::InvalidArgument(format!(
                "audio source needs at least one channel, got {}",
                properties.channel_count
            )));
        }
        let controller = self.remote()?;

        // The slot exists before the call so callbacks made during creation
        // can already resolve it.
        let handle = self.shared.objects.lock().audio_sources.insert(AudioSourceProxy {
            host_ref,
            remote: AudioSourceRef::NULL,
            channel_count: properties.channel_count,
            sample_count: properties.sample_count,
            sample_rate: properties.sample_rate,
        });
        let local = AudioSourceHostRef(handle.to_bits());

        let created: Result<AudioSourceRef> =
            self.call(Selector::CreateAudioSource, &(controller, local, properties));
        let mut objects = self.shared.objects.lock();
        match created {
            Ok(remote) => {
                if let Some(record) = objects.audio_sources.get_mut(handle) {
                    record.remote = remote;
                }
                debug!(local = local.bits(), remote = remote.bits(), "audio source created");
                Ok(AudioSourceRef(handle.to_bits()))
            }
            Err(e) => {
                objects.audio_sources.remove(handle);
                Err(e)
            }
        }
    }

    pub fn update_audio_source_properties(
        &self,
        audio_source: AudioSourceRef,
        properties: &AudioSourceProperties,
    ) -> Result<()> {
        let record = self.audio_source_record(audio_source)?;
        debug_assert_eq!(
            record.channel_count, properties.channel_count,
            "channel count of an audio source cannot change"
        );
        self.call::<_, ()>(
            Selector::UpdateAudioSourceProperties,
            &(self.remote()?, record.remote, properties),
        )?;
        let mut objects = self.shared.objects.lock();
        if let Ok(record) = objects.audio_sources.lookup_mut(audio_source.bits()) {
            record.sample_count = properties.sample_count;
            record.sample_rate = properties.sample_rate;
        }
        Ok(())
    }

    pub fn update_audio_source_content(
        &self,
        audio_source: AudioSourceRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    ) -> Result<()> {
        let record = self.audio_source_record(audio_source)?;
        if cfg!(debug_assertions) {
            if let Some(range) = range {
                if range.start < 0.0 || range.duration < 0.0 || range.start + range.duration > record.duration() {
                    return Err(IpcError::InvalidArgument(format!(
                        "content range {}+{} exceeds audio source duration {}",
                        range.start,
                        range.duration,
                        record.duration()
                    )));
                }
            }
        }
        self.call(
            Selector::UpdateAudioSourceContent,
            &(self.remote()?, record.remote, range, flags),
        )
    }

    pub fn enable_audio_source_samples_access(&self, audio_source: AudioSourceRef, enable: bool) -> Result<()> {
        let remote = self.remote_audio_source(audio_source)?;
        self.call(
            Selector::EnableAudioSourceSamplesAccess,
            &(self.remote()?, remote, AraBool(enable)),
        )
    }

    pub fn deactivate_audio_source_for_undo_history(
        &self,
        audio_source: AudioSourceRef,
        deactivate: bool,
    ) -> Result<()> {
        let remote = self.remote_audio_source(audio_source)?;
        self.call(
            Selector::DeactivateAudioSourceForUndoHistory,
            &(self.remote()?, remote, AraBool(deactivate)),
        )
    }

    /// Destroy an audio source. Its local handle is invalid afterwards even
    /// if the remote call fails.
    pub fn destroy_audio_source(&self, audio_source: AudioSourceRef) -> Result<()> {
        let controller = self.remote()?;
        let remote = self.remote_audio_source(audio_source)?;
        let result = self.call(Selector::DestroyAudioSource, &(controller, remote));
        let handle = Handle::from_bits(ObjectKind::AudioSource, audio_source.bits());
        if let Some(handle) = handle {
            self.shared.objects.lock().audio_sources.remove(handle);
        }
        debug!(local = audio_source.bits(), "audio source destroyed");
        result
    }

    pub fn create_audio_modification(
        &self,
        audio_source: AudioSourceRef,
        host_ref: AudioModificationHostRef,
        properties: &AudioModificationProperties,
    ) -> Result<AudioModificationRef> {
        let remote = self.remote_audio_source(audio_source)?;
        self.call(
            Selector::CreateAudioModification,
            &(self.remote()?, remote, host_ref, properties),
        )
    }

    pub fn store_objects_to_archive(
        &self,
        writer: ArchiveWriterHostRef,
        filter: Option<&StoreObjectsFilter>,
    ) -> Result<bool> {
        let filter = match filter {
            Some(filter) => Some(StoreObjectsFilter {
                document_data: filter.document_data,
                audio_sources: filter
                    .audio_sources
                    .iter()
                    .map(|source| self.remote_audio_source(*source))
                    .collect::<Result<Vec<_>>>()?,
                audio_modifications: filter.audio_modifications.clone(),
            }),
            None => None,
        };
        let stored: AraBool = self.call(
            Selector::StoreObjectsToArchive,
            &(self.remote()?, writer, filter),
        )?;
        Ok(stored.into())
    }

    pub fn store_audio_source_to_audio_file_chunk(
        &self,
        writer: ArchiveWriterHostRef,
        audio_source: AudioSourceRef,
    ) -> Result<Option<AudioFileChunk>> {
        let remote = self.remote_audio_source(audio_source)?;
        self.call(
            Selector::StoreAudioSourceToAudioFileChunk,
            &(self.remote()?, writer, remote),
        )
    }

    pub fn is_audio_source_content_analysis_incomplete(
        &self,
        audio_source: AudioSourceRef,
        content_type: ContentType,
    ) -> Result<bool> {
        let remote = self.remote_audio_source(audio_source)?;
        let incomplete: AraBool = self.call(
            Selector::IsAudioSourceContentAnalysisIncomplete,
            &(self.remote()?, remote, content_type),
        )?;
        Ok(incomplete.into())
    }

    pub fn request_audio_source_content_analysis(
        &self,
        audio_source: AudioSourceRef,
        content_types: &[ContentType],
    ) -> Result<()> {
        let remote = self.remote_audio_source(audio_source)?;
        self.call(
            Selector::RequestAudioSourceContentAnalysis,
            &(self.remote()?, remote, content_types),
        )
    }

    pub fn get_processing_algorithm_for_audio_source(&self, audio_source: AudioSourceRef) -> Result<i32> {
        let remote = self.remote_audio_source(audio_source)?;
        self.call(
            Selector::GetProcessingAlgorithmForAudioSource,
            &(self.remote()?, remote),
        )
    }

    pub fn request_processing_algorithm_for_audio_source(
        &self,
        audio_source: AudioSourceRef,
        algorithm_index: i32,
    ) -> Result<()> {
        if algorithm_index < 0 {
            return Err(IpcError::InvalidArgument(format!(
                "processing algorithm index {algorithm_index} is negative"
            )));
        }
        let remote = self.remote_audio_source(audio_source)?;
        self.call(
            Selector::RequestProcessingAlgorithmForAudioSource,
            &(self.remote()?, remote, algorithm_index),
        )
    }

    /// Properties of the algorithm currently used for `audio_source`.
    pub fn processing_algorithm_of_audio_source(
        &self,
        audio_source: AudioSourceRef,
    ) -> Result<Option<ProcessingAlgorithmProperties>> {
        let index = self.get_processing_algorithm_for_audio_source(audio_source)?;
        self.get_processing_algorithm_properties(index)
    }
}
