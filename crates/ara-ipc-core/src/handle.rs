//! Generational handle tables.
//!
//! Every object that is addressed from the other process lives in a
//! [`HandleTable`] of its kind. The handle handed across the boundary packs the
//! object kind, the slot generation and the slot index into one non-zero `u64`:
//!
//! ```text
//! [ kind : 8 ][ generation : 24 ][ index : 32 ]
//! ```
//!
//! A handle only validates while its slot still holds the same generation, so a
//! handle kept past the object's removal (or presented for the wrong kind) is
//! rejected even after the slot has been reused.

use crate::error::{IpcError, Result};
use serde::{Deserialize, Serialize};

const GENERATION_BITS: u32 = 24;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectKind {
    DocumentController = 1,
    MusicalContext = 2,
    RegionSequence = 3,
    AudioSource = 4,
    AudioModification = 5,
    PlaybackRegion = 6,
    ContentReader = 7,
    AudioReader = 8,
    HostContentReader = 9,
    PlugInExtension = 10,
    PlaybackRenderer = 11,
    EditorRenderer = 12,
    EditorView = 13,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::DocumentController => write!(f, "document controller"),
            ObjectKind::MusicalContext => write!(f, "musical context"),
            ObjectKind::RegionSequence => write!(f, "region sequence"),
            ObjectKind::AudioSource => write!(f, "audio source"),
            ObjectKind::AudioModification => write!(f, "audio modification"),
            ObjectKind::PlaybackRegion => write!(f, "playback region"),
            ObjectKind::ContentReader => write!(f, "content reader"),
            ObjectKind::AudioReader => write!(f, "audio reader"),
            ObjectKind::HostContentReader => write!(f, "host content reader"),
            ObjectKind::PlugInExtension => write!(f, "plug-in extension"),
            ObjectKind::PlaybackRenderer => write!(f, "playback renderer"),
            ObjectKind::EditorRenderer => write!(f, "editor renderer"),
            ObjectKind::EditorView => write!(f, "editor view"),
        }
    }
}

/// Local identity of a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    kind: ObjectKind,
    generation: u32,
    index: u32,
}

impl Handle {
    pub fn kind(self) -> ObjectKind {
        self.kind
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Bit pattern sent across the process boundary. Never zero.
    pub fn to_bits(self) -> u64 {
        ((self.kind as u64) << 56) | ((self.generation as u64) << 32) | self.index as u64
    }

    /// Reinterpret wire bits as a handle of `kind`.
    ///
    /// Returns `None` for the null handle and for bits tagged with another kind.
    /// Whether the handle is still live is a separate question for the table.
    pub fn from_bits(kind: ObjectKind, bits: u64) -> Option<Self> {
        if (bits >> 56) as u8 != kind as u8 {
            return None;
        }
        let generation = ((bits >> 32) as u32) & GENERATION_MASK;
        if generation == 0 {
            return None;
        }
        Some(Self {
            kind,
            generation,
            index: bits as u32,
        })
    }
}

fn next_generation(generation: u32) -> u32 {
    let next = (generation + 1) & GENERATION_MASK;
    if next == 0 {
        1
    } else {
        next
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Dense slot table with per-slot generations.
#[derive(Debug)]
pub struct HandleTable<T> {
    kind: ObjectKind,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> HandleTable<T> {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: T) -> Handle {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].value = Some(value);
                index
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    value: Some(value),
                });
                index
            }
        };
        self.len += 1;
        Handle {
            kind: self.kind,
            generation: self.slots[index as usize].generation,
            index,
        }
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        if handle.kind != self.kind {
            return None;
        }
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    /// Look up a handle that came from this process rather than from the peer.
    ///
    /// A stale handle here is a local programming error, so debug builds assert.
    pub fn expect_valid(&self, handle: Handle) -> Option<&T> {
        debug_assert!(
            self.is_valid(handle),
            "stale {} handle {:#018x} used locally",
            self.kind,
            handle.to_bits()
        );
        self.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.index as usize].value.as_mut()
    }

    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }
        let slot = &mut self.slots[handle.index as usize];
        let value = slot.value.take();
        slot.generation = next_generation(slot.generation);
        self.free.push(handle.index);
        self.len -= 1;
        value
    }

    /// Translate wire bits into a live handle of this table.
    pub fn resolve(&self, bits: u64) -> Result<Handle> {
        Handle::from_bits(self.kind, bits)
            .filter(|handle| self.is_valid(*handle))
            .ok_or(IpcError::StaleHandle {
                kind: self.kind,
                handle: bits,
            })
    }

    pub fn lookup(&self, bits: u64) -> Result<&T> {
        let handle = self.resolve(bits)?;
        Ok(self
            .get(handle)
            .expect("BUG: resolved handle must have a value"))
    }

    pub fn lookup_mut(&mut self, bits: u64) -> Result<&mut T> {
        let handle = self.resolve(bits)?;
        Ok(self
            .get_mut(handle)
            .expect("BUG: resolved handle must have a value"))
    }

    pub fn take(&mut self, bits: u64) -> Result<T> {
        let handle = self.resolve(bits)?;
        Ok(self
            .remove(handle)
            .expect("BUG: resolved handle must have a value"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        let kind = self.kind;
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        kind,
                        generation: slot.generation,
                        index: index as u32,
                    },
                    value,
                )
            })
        })
    }

    /// Remove every entry, invalidating all outstanding handles.
    pub fn drain(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.len);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = next_generation(slot.generation);
                self.free.push(index as u32);
                drained.push(value);
            }
        }
        self.len = 0;
        drained
    }
}
