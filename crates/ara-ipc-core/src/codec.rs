//! Argument codec.
//!
//! Call arguments are encoded as one tuple per selector, in declaration order,
//! with fixed-width little-endian integers. Decoding rejects short payloads and
//! trailing bytes: sender and receiver agree on each selector's argument shape
//! by construction, so any mismatch is a protocol defect.
//!
//! Element kinds on the wire:
//! - integers and floats: fixed width
//! - refs: their `u64` bits
//! - booleans: ARA sentinel bytes ([`ara_bool`], [`AraBool`])
//! - strings, byte arrays, arrays: `u64` length + elements
//! - `Option<T>`: presence byte + payload only when present
//! - structs: field values at encode time, nested arrays inlined

use crate::error::{IpcError, Result};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(options().serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    options().deserialize(payload).map_err(|e| {
        IpcError::Protocol(format!(
            "cannot decode {} from {} bytes: {}",
            std::any::type_name::<T>(),
            payload.len(),
            e
        ))
    })
}

/// Serde adapter writing `bool` as the ARA sentinel bytes.
pub mod ara_bool {
    use super::*;
    use serde::de::Error;

    pub const ARA_FALSE: u8 = 0;
    pub const ARA_TRUE: u8 = 1;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(if *value { ARA_TRUE } else { ARA_FALSE })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            ARA_FALSE => Ok(false),
            ARA_TRUE => Ok(true),
            other => Err(D::Error::custom(format!("invalid ARA bool sentinel {other}"))),
        }
    }
}

/// Standalone boolean argument in sentinel form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AraBool(#[serde(with = "ara_bool")] pub bool);

impl From<bool> for AraBool {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<AraBool> for bool {
    fn from(value: AraBool) -> bool {
        value.0
    }
}
