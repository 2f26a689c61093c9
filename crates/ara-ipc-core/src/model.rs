//! Model snapshots exchanged across the boundary.
//!
//! These are plain owned structs. The sender encodes the values it holds at
//! call time and the receiver gets its own copy, so nothing here points into a
//! transient reply buffer.

use crate::codec::ara_bool;
use crate::content::ContentType;
use crate::error::{IpcError, Result};
use crate::refs::{
    AudioModificationRef, AudioSourceRef, MusicalContextRef, PlaybackRegionRef, RegionSequenceRef,
};
use serde::{Deserialize, Serialize};

macro_rules! bit_flags {
    ($(#[$meta:meta])* $name:ident { $($flag:ident = $value:expr,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            $(pub const $flag: Self = Self($value);)*

            pub fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }
    };
}

bit_flags! {
    /// Which scopes of an object's content stayed the same in an update.
    ContentUpdateFlags {
        EVERYTHING_CHANGED = 0,
        SIGNAL_UNCHANGED = 1 << 0,
        NOTES_UNCHANGED = 1 << 1,
        TIMING_UNCHANGED = 1 << 2,
        TUNING_UNCHANGED = 1 << 3,
        HARMONIC_UNCHANGED = 1 << 4,
    }
}

bit_flags! {
    PlaybackTransformationFlags {
        NO_CHANGES = 0,
        TIMESTRETCH = 1 << 0,
        TIMESTRETCH_REFLECTING_TEMPO = 1 << 1,
        CONTENT_BASED_FADE_AT_HEAD = 1 << 2,
        CONTENT_BASED_FADE_AT_TAIL = 1 << 3,
    }
}

bit_flags! {
    /// Roles a plug-in instance can take on for a document controller.
    PlugInRoles {
        NONE = 0,
        PLAYBACK_RENDERER = 1 << 0,
        EDITOR_RENDERER = 1 << 1,
        EDITOR_VIEW = 1 << 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentProperties {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicalContextProperties {
    pub name: Option<String>,
    pub order_index: i32,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSequenceProperties {
    pub name: Option<String>,
    pub order_index: i32,
    pub musical_context: MusicalContextRef,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSourceProperties {
    pub name: Option<String>,
    pub persistent_id: String,
    pub sample_count: i64,
    pub sample_rate: f64,
    pub channel_count: i32,
    #[serde(with = "ara_bool")]
    pub merits_64_bit_samples: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioModificationProperties {
    pub name: Option<String>,
    pub persistent_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRegionProperties {
    pub transformation_flags: PlaybackTransformationFlags,
    pub start_in_modification_time: f64,
    pub duration_in_modification_time: f64,
    pub start_in_playback_time: f64,
    pub duration_in_playback_time: f64,
    pub musical_context: MusicalContextRef,
    pub region_sequence: RegionSequenceRef,
    pub name: Option<String>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentTimeRange {
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContentGrade {
    #[default]
    Initial,
    Detected,
    Adjusted,
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisProgressState {
    Started,
    Updated,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRegionHeadAndTailTime {
    pub head_time: f64,
    pub tail_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingAlgorithmProperties {
    pub persistent_id: String,
    pub name: String,
}

/// Which archived objects to restore, and under which current IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreObjectsFilter {
    #[serde(with = "ara_bool")]
    pub document_data: bool,
    pub audio_source_archive_ids: Vec<String>,
    pub audio_source_current_ids: Vec<String>,
    pub audio_modification_archive_ids: Vec<String>,
    pub audio_modification_current_ids: Vec<String>,
}

/// Which objects to write into an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreObjectsFilter {
    #[serde(with = "ara_bool")]
    pub document_data: bool,
    pub audio_sources: Vec<AudioSourceRef>,
    pub audio_modifications: Vec<AudioModificationRef>,
}

/// Result of storing an audio source into its audio file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFileChunk {
    pub document_archive_id: String,
    #[serde(with = "ara_bool")]
    pub open_automatically: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSelection {
    pub playback_regions: Vec<PlaybackRegionRef>,
    pub region_sequences: Vec<RegionSequenceRef>,
    pub time_range: Option<ContentTimeRange>,
}

/// Capability description of a plug-in factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryDescriptor {
    pub lowest_supported_api_generation: u32,
    pub highest_supported_api_generation: u32,
    pub factory_id: String,
    pub plugin_name: String,
    pub manufacturer_name: String,
    pub information_url: String,
    pub version: String,
    pub document_archive_id: String,
    pub compatible_document_archive_ids: Vec<String>,
    pub analyzeable_content_types: Vec<ContentType>,
    pub supported_playback_transformation_flags: PlaybackTransformationFlags,
    #[serde(with = "ara_bool")]
    pub supports_storing_audio_file_chunks: bool,
}

impl FactoryDescriptor {
    /// Whether archives written under `archive_id` can be restored by this factory.
    pub fn can_restore(&self, archive_id: &str) -> bool {
        self.document_archive_id == archive_id
            || self.compatible_document_archive_ids.iter().any(|id| id == archive_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    #[default]
    Float32,
    Float64,
}

impl SampleFormat {
    pub fn from_merits_64_bit(merits_64_bit_samples: bool) -> Self {
        if merits_64_bit_samples {
            SampleFormat::Float64
        } else {
            SampleFormat::Float32
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Float32 => 4,
            SampleFormat::Float64 => 8,
        }
    }
}

/// Caller-owned per-channel destination buffers for a sample read.
pub enum SampleBuffers<'a, 'b> {
    Float32(&'a mut [&'b mut [f32]]),
    Float64(&'a mut [&'b mut [f64]]),
}

impl SampleBuffers<'_, '_> {
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleBuffers::Float32(_) => SampleFormat::Float32,
            SampleBuffers::Float64(_) => SampleFormat::Float64,
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            SampleBuffers::Float32(channels) => channels.len(),
            SampleBuffers::Float64(channels) => channels.len(),
        }
    }

    /// Whether every channel can hold `frames` samples.
    pub fn can_hold(&self, frames: usize) -> bool {
        match self {
            SampleBuffers::Float32(channels) => channels.iter().all(|c| c.len() >= frames),
            SampleBuffers::Float64(channels) => channels.iter().all(|c| c.len() >= frames),
        }
    }
}

/// Samples of one read, channel after channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleBlock {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

fn split_channels<T>(data: &mut [T], channel_count: usize) -> Vec<&mut [T]> {
    if channel_count == 0 {
        return Vec::new();
    }
    let frames = data.len() / channel_count;
    if frames == 0 {
        return (0..channel_count).map(|_| <&mut [T]>::default()).collect();
    }
    data.chunks_mut(frames).take(channel_count).collect()
}

fn copy_channels<T: Copy>(data: &[T], channels: &mut [&mut [T]], frames: usize) -> Result<()> {
    if data.len() != channels.len() * frames {
        return Err(IpcError::InvalidArgument(format!(
            "sample block of {} values does not match {} channels x {} frames",
            data.len(),
            channels.len(),
            frames
        )));
    }
    if frames == 0 {
        return Ok(());
    }
    if let Some(short) = channels.iter().find(|channel| channel.len() < frames) {
        return Err(IpcError::InvalidArgument(format!(
            "channel buffer of {} frames cannot hold {} frames",
            short.len(),
            frames
        )));
    }
    for (channel, source) in channels.iter_mut().zip(data.chunks(frames)) {
        channel[..frames].copy_from_slice(source);
    }
    Ok(())
}

fn splice_channels<T: Copy>(dest: &mut [T], slice: &[T], channel_count: usize, offset: usize) -> Result<()> {
    if channel_count == 0 {
        return Ok(());
    }
    let total = dest.len() / channel_count;
    let frames = slice.len() / channel_count;
    let fits = slice.len() == frames * channel_count && offset.checked_add(frames).is_some_and(|end| end <= total);
    if !fits {
        return Err(IpcError::InvalidArgument(format!(
            "slice of {} values does not fit {} channels at frame {} of {}",
            slice.len(),
            channel_count,
            offset,
            total
        )));
    }
    for channel in 0..channel_count {
        dest[channel * total + offset..][..frames].copy_from_slice(&slice[channel * frames..][..frames]);
    }
    Ok(())
}

impl SampleBlock {
    /// Bytes an encoded `Option<SampleBlock>` adds around its samples.
    pub const ENCODED_OVERHEAD: usize = 16;

    pub fn zeroed(format: SampleFormat, channel_count: usize, frames: usize) -> Result<Self> {
        let len = channel_count.checked_mul(frames).ok_or_else(|| {
            IpcError::InvalidArgument(format!("{channel_count} channels x {frames} frames overflows"))
        })?;
        Ok(match format {
            SampleFormat::Float32 => SampleBlock::Float32(vec![0.0; len]),
            SampleFormat::Float64 => SampleBlock::Float64(vec![0.0; len]),
        })
    }

    /// Encoded size of a block as a reply payload, `None` on overflow.
    pub fn encoded_size(format: SampleFormat, channel_count: usize, frames: usize) -> Option<usize> {
        channel_count
            .checked_mul(frames)?
            .checked_mul(format.bytes_per_sample())?
            .checked_add(Self::ENCODED_OVERHEAD)
    }

    /// Most frames per channel whose block fits in `payload_limit` bytes.
    pub fn frames_within(payload_limit: usize, format: SampleFormat, channel_count: usize) -> usize {
        let frame_bytes = channel_count.max(1).saturating_mul(format.bytes_per_sample());
        payload_limit.saturating_sub(Self::ENCODED_OVERHEAD) / frame_bytes
    }

    /// Copy `slice`, a shorter block of the same channels, into this block
    /// starting at frame `offset`.
    pub fn splice(&mut self, slice: &SampleBlock, channel_count: usize, offset: usize) -> Result<()> {
        match (self, slice) {
            (SampleBlock::Float32(dest), SampleBlock::Float32(data)) => {
                splice_channels(dest, data, channel_count, offset)
            }
            (SampleBlock::Float64(dest), SampleBlock::Float64(data)) => {
                splice_channels(dest, data, channel_count, offset)
            }
            (dest, slice) => Err(IpcError::InvalidArgument(format!(
                "{:?} slice cannot be spliced into a {:?} block",
                slice.format(),
                dest.format()
            ))),
        }
    }

    pub fn format(&self) -> SampleFormat {
        match self {
            SampleBlock::Float32(_) => SampleFormat::Float32,
            SampleBlock::Float64(_) => SampleFormat::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleBlock::Float32(data) => data.len(),
            SampleBlock::Float64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lend the block out as per-channel buffers.
    pub fn with_buffers<R>(
        &mut self,
        channel_count: usize,
        f: impl FnOnce(SampleBuffers<'_, '_>) -> R,
    ) -> R {
        match self {
            SampleBlock::Float32(data) => {
                let mut channels = split_channels(data, channel_count);
                f(SampleBuffers::Float32(&mut channels))
            }
            SampleBlock::Float64(data) => {
                let mut channels = split_channels(data, channel_count);
                f(SampleBuffers::Float64(&mut channels))
            }
        }
    }

    /// Copy the block into caller buffers. Both must use the same sample format.
    pub fn copy_into(&self, buffers: SampleBuffers<'_, '_>, frames: usize) -> Result<()> {
        match (self, buffers) {
            (SampleBlock::Float32(data), SampleBuffers::Float32(channels)) => {
                copy_channels(data, channels, frames)
            }
            (SampleBlock::Float64(data), SampleBuffers::Float64(channels)) => {
                copy_channels(data, channels, frames)
            }
            (block, buffers) => Err(IpcError::InvalidArgument(format!(
                "{:?} samples cannot be copied into {:?} buffers",
                block.format(),
                buffers.format()
            ))),
        }
    }
}
