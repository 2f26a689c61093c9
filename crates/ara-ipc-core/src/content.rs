//! Content types and their per-event records.
//!
//! A content reader only ever yields events of one type, so event data travels
//! without a tag: the reader's content type picks the record layout on both
//! ends.

use crate::codec::{decode, encode};
use crate::error::{IpcError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Notes,
    TempoEntries,
    BarSignatures,
    StaticTuning,
    KeySignatures,
    SheetChords,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::Notes,
        ContentType::TempoEntries,
        ContentType::BarSignatures,
        ContentType::StaticTuning,
        ContentType::KeySignatures,
        ContentType::SheetChords,
    ];

    pub fn identifier(self) -> &'static str {
        match self {
            ContentType::Notes => "org.ara-audio.content.notes",
            ContentType::TempoEntries => "org.ara-audio.content.tempoentries",
            ContentType::BarSignatures => "org.ara-audio.content.barsignatures",
            ContentType::StaticTuning => "org.ara-audio.content.statictuning",
            ContentType::KeySignatures => "org.ara-audio.content.keysignatures",
            ContentType::SheetChords => "org.ara-audio.content.sheetchords",
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.identifier() == identifier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Hz, or 0 when the note is unpitched.
    pub frequency: f32,
    pub pitch_number: i32,
    pub volume: f32,
    pub start_position: f64,
    pub attack_duration: f64,
    pub note_duration: f64,
    pub signal_duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEntry {
    pub time_position: f64,
    pub quarter_position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarSignature {
    pub numerator: i32,
    pub denominator: i32,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub concert_pitch_frequency: f32,
    pub root: i32,
    /// Cent offsets per pitch class, starting at C.
    pub tunings: [f32; 12],
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySignature {
    pub root: i32,
    pub intervals: [u8; 12],
    pub name: Option<String>,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub root: i32,
    pub bass: i32,
    pub intervals: [u8; 12],
    pub name: Option<String>,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    Note(NoteEvent),
    Tempo(TempoEntry),
    BarSignature(BarSignature),
    Tuning(Tuning),
    KeySignature(KeySignature),
    Chord(Chord),
}

impl ContentEvent {
    pub fn content_type(&self) -> ContentType {
        match self {
            ContentEvent::Note(_) => ContentType::Notes,
            ContentEvent::Tempo(_) => ContentType::TempoEntries,
            ContentEvent::BarSignature(_) => ContentType::BarSignatures,
            ContentEvent::Tuning(_) => ContentType::StaticTuning,
            ContentEvent::KeySignature(_) => ContentType::KeySignatures,
            ContentEvent::Chord(_) => ContentType::SheetChords,
        }
    }
}

/// Encode the record body of an event, without a type tag.
pub fn encode_content_event(event: &ContentEvent) -> Result<Vec<u8>> {
    match event {
        ContentEvent::Note(note) => encode(note),
        ContentEvent::Tempo(tempo) => encode(tempo),
        ContentEvent::BarSignature(signature) => encode(signature),
        ContentEvent::Tuning(tuning) => encode(tuning),
        ContentEvent::KeySignature(key) => encode(key),
        ContentEvent::Chord(chord) => encode(chord),
    }
}

/// Encode an event read from a reader of `content_type`, checking that they agree.
pub fn encode_content_event_as(content_type: ContentType, event: &ContentEvent) -> Result<Vec<u8>> {
    if event.content_type() != content_type {
        return Err(IpcError::InvalidState(format!(
            "{:?} reader produced a {:?} event",
            content_type,
            event.content_type()
        )));
    }
    encode_content_event(event)
}

pub fn decode_content_event(content_type: ContentType, data: &[u8]) -> Result<ContentEvent> {
    Ok(match content_type {
        ContentType::Notes => ContentEvent::Note(decode(data)?),
        ContentType::TempoEntries => ContentEvent::Tempo(decode(data)?),
        ContentType::BarSignatures => ContentEvent::BarSignature(decode(data)?),
        ContentType::StaticTuning => ContentEvent::Tuning(decode(data)?),
        ContentType::KeySignatures => ContentEvent::KeySignature(decode(data)?),
        ContentType::SheetChords => ContentEvent::Chord(decode(data)?),
    })
}
