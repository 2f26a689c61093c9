//! Content access proxy.
//!
//! Event data arrives as untagged record bytes. The proxy remembers the content
//! type of each reader it opened and decodes with it.

use crate::host_link::HostLink;
use crate::registry::LiveRegistry;
use ara_ipc_core::api::ContentAccessController;
use ara_ipc_core::content::decode_content_event;
use ara_ipc_core::model::{ContentGrade, ContentTimeRange};
use ara_ipc_core::refs::{AudioSourceHostRef, ContentReaderHostRef, MusicalContextHostRef};
use ara_ipc_core::{AraBool, ContentEvent, ContentType, ObjectKind, Selector};
use parking_lot::Mutex;
use tracing::{error, warn};

#[derive(Debug)]
pub struct ContentAccessProxy {
    link: HostLink,
    readers: Mutex<LiveRegistry<ContentReaderHostRef, ContentType>>,
}

impl ContentAccessProxy {
    pub(crate) fn new(link: HostLink) -> Self {
        Self {
            link,
            readers: Mutex::new(LiveRegistry::new(ObjectKind::HostContentReader)),
        }
    }

    pub fn open_reader_count(&self) -> usize {
        self.readers.lock().len()
    }

    fn register(&self, reader: Option<Option<ContentReaderHostRef>>, content_type: ContentType) -> Option<ContentReaderHostRef> {
        let reader = reader.flatten().filter(|r| !r.is_null())?;
        self.readers.lock().insert(reader, content_type);
        Some(reader)
    }
}

impl ContentAccessController for ContentAccessProxy {
    fn is_musical_context_content_available(
        &self,
        musical_context: MusicalContextHostRef,
        content_type: ContentType,
    ) -> bool {
        self.link
            .call::<_, AraBool>(
                Selector::HostIsMusicalContextContentAvailable,
                &(self.link.controller(), musical_context, content_type),
            )
            .is_some_and(bool::from)
    }

    fn get_musical_context_content_grade(
        &self,
        musical_context: MusicalContextHostRef,
        content_type: ContentType,
    ) -> ContentGrade {
        self.link
            .call(
                Selector::HostGetMusicalContextContentGrade,
                &(self.link.controller(), musical_context, content_type),
            )
            .unwrap_or_default()
    }

    fn create_musical_context_content_reader(
        &self,
        musical_context: MusicalContextHostRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderHostRef> {
        let reader = self.link.call(
            Selector::HostCreateMusicalContextContentReader,
            &(self.link.controller(), musical_context, content_type, range),
        );
        self.register(reader, content_type)
    }

    fn is_audio_source_content_available(&self, audio_source: AudioSourceHostRef, content_type: ContentType) -> bool {
        self.link
            .call::<_, AraBool>(
                Selector::HostIsAudioSourceContentAvailable,
                &(self.link.controller(), audio_source, content_type),
            )
            .is_some_and(bool::from)
    }

    fn get_audio_source_content_grade(&self, audio_source: AudioSourceHostRef, content_type: ContentType) -> ContentGrade {
        self.link
            .call(
                Selector::HostGetAudioSourceContentGrade,
                &(self.link.controller(), audio_source, content_type),
            )
            .unwrap_or_default()
    }

    fn create_audio_source_content_reader(
        &self,
        audio_source: AudioSourceHostRef,
        content_type: ContentType,
        range: Option<ContentTimeRange>,
    ) -> Option<ContentReaderHostRef> {
        let reader = self.link.call(
            Selector::HostCreateAudioSourceContentReader,
            &(self.link.controller(), audio_source, content_type, range),
        );
        self.register(reader, content_type)
    }

    fn get_content_reader_event_count(&self, reader: ContentReaderHostRef) -> i32 {
        if let Err(e) = self.readers.lock().check(reader) {
            error!(error = %e, "event count of unknown content reader");
            return 0;
        }
        self.link
            .call(
                Selector::HostGetContentReaderEventCount,
                &(self.link.controller(), reader),
            )
            .unwrap_or(0)
    }

    fn get_content_reader_data_for_event(&self, reader: ContentReaderHostRef, event_index: i32) -> Option<ContentEvent> {
        let content_type = match self.readers.lock().get(reader) {
            Ok(content_type) => *content_type,
            Err(e) => {
                error!(error = %e, "event data of unknown content reader");
                return None;
            }
        };
        let data = self
            .link
            .call::<_, Option<Vec<u8>>>(
                Selector::HostGetContentReaderDataForEvent,
                &(self.link.controller(), reader, event_index),
            )
            .flatten()?;
        match decode_content_event(content_type, &data) {
            Ok(event) => Some(event),
            Err(e) => {
                error!(reader = reader.bits(), event_index, error = %e, "undecodable content event");
                None
            }
        }
    }

    fn destroy_content_reader(&self, reader: ContentReaderHostRef) {
        if self.readers.lock().remove(reader).is_none() {
            warn!(reader = reader.bits(), "destroying unknown content reader");
        }
        let _: Option<()> = self.link.call(
            Selector::HostDestroyContentReader,
            &(self.link.controller(), reader),
        );
    }
}
