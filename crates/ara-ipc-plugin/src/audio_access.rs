//! Audio access proxy.
//!
//! Sample data comes back as owned blocks. A read too large for one reply is
//! fetched in slices and staged; any failed slice fails the whole read. A
//! failed read leaves the caller's buffers untouched; the host reader decides
//! what a failed read means for the samples, this side does not zero-fill.

use crate::host_link::HostLink;
use crate::registry::LiveRegistry;
use ara_ipc_core::api::AudioAccessController;
use ara_ipc_core::model::{SampleBlock, SampleBuffers, SampleFormat};
use ara_ipc_core::refs::{AudioReaderHostRef, AudioSourceHostRef};
use ara_ipc_core::{AraBool, ObjectKind, Selector};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

#[derive(Debug)]
pub struct AudioAccessProxy {
    link: HostLink,
    /// Sample format of each open reader.
    readers: Mutex<LiveRegistry<AudioReaderHostRef, SampleFormat>>,
}

impl AudioAccessProxy {
    pub(crate) fn new(link: HostLink) -> Self {
        Self {
            link,
            readers: Mutex::new(LiveRegistry::new(ObjectKind::AudioReader)),
        }
    }

    pub fn open_reader_count(&self) -> usize {
        self.readers.lock().len()
    }

    fn read_slice(&self, reader: AudioReaderHostRef, sample_position: i64, frames: usize) -> Option<SampleBlock> {
        self.link
            .call::<_, Option<SampleBlock>>(
                Selector::ReadAudioSamples,
                &(self.link.controller(), reader, sample_position, frames as i64),
            )
            .flatten()
    }

    /// All `frames` of every channel, in as many calls as the frame limit needs.
    fn fetch(
        &self,
        reader: AudioReaderHostRef,
        sample_position: i64,
        frames: usize,
        channel_count: usize,
        format: SampleFormat,
    ) -> Option<SampleBlock> {
        let slice_frames = SampleBlock::frames_within(self.link.max_payload_size()?, format, channel_count);
        if frames <= slice_frames {
            return self.read_slice(reader, sample_position, frames);
        }
        if slice_frames == 0 {
            error!(reader = reader.bits(), channel_count, "one frame of samples exceeds the frame size limit");
            return None;
        }

        let mut staged = match SampleBlock::zeroed(format, channel_count, frames) {
            Ok(block) => block,
            Err(e) => {
                error!(reader = reader.bits(), error = %e, "cannot stage sample read");
                return None;
            }
        };
        let mut offset = 0;
        while offset < frames {
            let count = slice_frames.min(frames - offset);
            let slice = self.read_slice(reader, sample_position.saturating_add(offset as i64), count)?;
            if let Err(e) = staged.splice(&slice, channel_count, offset) {
                warn!(reader = reader.bits(), offset, error = %e, "sample slice does not fit the read");
                return None;
            }
            offset += count;
        }
        debug!(reader = reader.bits(), frames, slice_frames, "sample read fetched in slices");
        Some(staged)
    }
}

impl AudioAccessController for AudioAccessProxy {
    fn create_audio_reader_for_source(
        &self,
        audio_source: AudioSourceHostRef,
        use_64_bit_samples: bool,
    ) -> Option<AudioReaderHostRef> {
        let reader: Option<AudioReaderHostRef> = self.link.call(
            Selector::CreateAudioReaderForSource,
            &(self.link.controller(), audio_source, AraBool(use_64_bit_samples)),
        )?;
        let reader = reader.filter(|r| !r.is_null())?;
        self.readers
            .lock()
            .insert(reader, SampleFormat::from_merits_64_bit(use_64_bit_samples));
        Some(reader)
    }

    fn read_audio_samples(
        &self,
        reader: AudioReaderHostRef,
        sample_position: i64,
        samples_per_channel: i64,
        buffers: SampleBuffers<'_, '_>,
    ) -> bool {
        let format = match self.readers.lock().get(reader) {
            Ok(format) => *format,
            Err(e) => {
                error!(error = %e, "read from unknown audio reader");
                return false;
            }
        };
        if buffers.format() != format {
            error!(
                reader = reader.bits(),
                "reader delivers {:?} samples, buffers are {:?}",
                format,
                buffers.format()
            );
            return false;
        }
        if samples_per_channel < 0 || !buffers.can_hold(samples_per_channel as usize) {
            error!(reader = reader.bits(), samples_per_channel, "buffers cannot hold the requested samples");
            return false;
        }

        let frames = samples_per_channel as usize;
        let Some(block) = self.fetch(reader, sample_position, frames, buffers.channel_count(), format) else {
            return false;
        };
        match block.copy_into(buffers, frames) {
            Ok(()) => true,
            Err(e) => {
                warn!(reader = reader.bits(), error = %e, "sample block does not fit the buffers");
                false
            }
        }
    }

    fn destroy_audio_reader(&self, reader: AudioReaderHostRef) {
        if self.readers.lock().remove(reader).is_none() {
            warn!(reader = reader.bits(), "destroying unknown audio reader");
        }
        let _: Option<()> = self
            .link
            .call(Selector::DestroyAudioReader, &(self.link.controller(), reader));
    }
}
