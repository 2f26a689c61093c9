//! Content reader proxies.
//!
//! Event data crosses the boundary without a type tag, so each proxy keeps the
//! content type it was created for and decodes events with it.

use crate::document_controller::DocumentControllerProxy;
use ara_ipc_core::content::decode_content_event;
use ara_ipc_core::model::{ContentGrade, ContentTimeRange};
use ara_ipc_core::refs::{AudioModificationRef, AudioSourceRef, ContentReaderRef, PlaybackRegionRef};
use ara_ipc_core::{AraBool, ContentEvent, ContentType, Result, Selector};

#[derive(Debug, Clone, Copy)]
pub(crate) struct ContentReaderProxy {
    pub(crate) remote: ContentReaderRef,
    pub(crate) content_type: ContentType,
}

impl DocumentControllerProxy {
    fn register_content_reader(
        &self,
        remote: Option<ContentReaderRef>,
        content_type: ContentType,
    ) -> Option<ContentReaderRef> {
        let remote = remote.filter(|r| !r.is_null())?;
        let handle = self
            .shared
            .objects
            .lock()
            .content_readers
            .insert(ContentReaderProxy { remote, content_type });
        Some(ContentReaderRef(handle.to_bits()))
    }

    fn content_reader(&self, reader: ContentReaderRef) -> Result<ContentReaderProxy> {
        Ok(*self.shared.objects.lock().content_readers.lookup(reader.bits())?)
    }

    pub fn content_reader_type(&self, reader: ContentReaderRef) -> Result<ContentType> {
        Ok(self.content_reader(reader)?.content_type)
    }

    // Audio sources

    pub fn is_audio_source_content_available(
        &self,
        audio_source: AudioSourceRef,
        content_type: ContentType,
    ) -> Result<bool> {
        let remote = self.audio_source_remote_ref(audio_source)?;
        let available: AraBool = self.call(
            Selector::IsAudioSourceContentAvailable,
            &(self.remote()?, remote, content_type),
        )?;
        Ok(available.into())
    }

    pub fn get_audio_source_content_grade(
        &self,
        audio_source: AudioSourceRef,
        content_type: ContentType,
    ) -> Result<ContentGrade> {
        let remote = self.audio_source_remote_ref(audio_source)?;
        self.call(
            Selector::GetAudioSourceContentGrade,
            &(self.remote()?, remote, content_type),
        )
    }

    pub fn create_audio_source_content_reader(
        &self,
        audio_source: AudioSourceRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Result<Option<ContentReaderRef>> {
        let remote = self.audio_source_remote_ref(audio_source)?;
        let reader: Option<ContentReaderRef> = self.call(
            Selector::CreateAudioSourceContentReader,
            &(self.remote()?, remote, content_type, range),
        )?;
        Ok(self.register_content_reader(reader, content_type))
    }

    // Audio modifications

    pub fn is_audio_modification_content_available(
        &self,
        audio_modification: AudioModificationRef,
        content_type: ContentType,
    ) -> Result<bool> {
        let available: AraBool = self.call(
            Selector::IsAudioModificationContentAvailable,
            &(self.remote()?, audio_modification, content_type),
        )?;
        Ok(available.into())
    }

    pub fn get_audio_modification_content_grade(
        &self,
        audio_modification: AudioModificationRef,
        content_type: ContentType,
    ) -> Result<ContentGrade> {
        self.call(
            Selector::GetAudioModificationContentGrade,
            &(self.remote()?, audio_modification, content_type),
        )
    }

    pub fn create_audio_modification_content_reader(
        &self,
        audio_modification: AudioModificationRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Result<Option<ContentReaderRef>> {
        let reader: Option<ContentReaderRef> = self.call(
            Selector::CreateAudioModificationContentReader,
            &(self.remote()?, audio_modification, content_type, range),
        )?;
        Ok(self.register_content_reader(reader, content_type))
    }

    // Playback regions

    pub fn is_playback_region_content_available(
        &self,
        playback_region: PlaybackRegionRef,
        content_type: ContentType,
    ) -> Result<bool> {
        let available: AraBool = self.call(
            Selector::IsPlaybackRegionContentAvailable,
            &(self.remote()?, playback_region, content_type),
        )?;
        Ok(available.into())
    }

    pub fn get_playback_region_content_grade(
        &self,
        playback_region: PlaybackRegionRef,
        content_type: ContentType,
    ) -> Result<ContentGrade> {
        self.call(
            Selector::GetPlaybackRegionContentGrade,
            &(self.remote()?, playback_region, content_type),
        )
    }

    pub fn create_playback_region_content_reader(
        &self,
        playback_region: PlaybackRegionRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Result<Option<ContentReaderRef>> {
        let reader: Option<ContentReaderRef> = self.call(
            Selector::CreatePlaybackRegionContentReader,
            &(self.remote()?, playback_region, content_type, range),
        )?;
        Ok(self.register_content_reader(reader, content_type))
    }

    // Readers

    pub fn get_content_reader_event_count(&self, reader: ContentReaderRef) -> Result<i32> {
        let proxy = self.content_reader(reader)?;
        self.call(
            Selector::GetContentReaderEventCount,
            &(self.remote()?, proxy.remote),
        )
    }

    pub fn get_content_reader_data_for_event(
        &self,
        reader: ContentReaderRef,
        event_index: i32,
    ) -> Result<Option<ContentEvent>> {
        let proxy = self.content_reader(reader)?;
        let data: Option<Vec<u8>> = self.call(
            Selector::GetContentReaderDataForEvent,
            &(self.remote()?, proxy.remote, event_index),
        )?;
        data.map(|data| decode_content_event(proxy.content_type, &data))
            .transpose()
    }

    /// Read every event of `reader` in order.
    pub fn content_reader_events(&self, reader: ContentReaderRef) -> Result<Vec<ContentEvent>> {
        let count = self.get_content_reader_event_count(reader)?;
        let mut events = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            if let Some(event) = self.get_content_reader_data_for_event(reader, index)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    pub fn destroy_content_reader(&self, reader: ContentReaderRef) -> Result<()> {
        let proxy = self.shared.objects.lock().content_readers.take(reader.bits())?;
        self.call(Selector::DestroyContentReader, &(self.remote()?, proxy.remote))
    }
}
