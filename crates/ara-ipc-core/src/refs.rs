//! Opaque object references.
//!
//! A ref is meaningful only to the process that issued it. The receiving side
//! stores it and sends it back unchanged; it never inspects the value.
//!
//! Plug-in refs (`AudioSourceRef`, ...) are issued by the plug-in side, host
//! refs (`AudioSourceHostRef`, ...) by the host side. Zero is the null ref.

use serde::{Deserialize, Serialize};

macro_rules! opaque_refs {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl $name {
                pub const NULL: Self = Self(0);

                pub fn is_null(self) -> bool {
                    self.0 == 0
                }

                pub fn bits(self) -> u64 {
                    self.0
                }
            }

            impl From<u64> for $name {
                fn from(bits: u64) -> Self {
                    Self(bits)
                }
            }

            impl From<$name> for u64 {
                fn from(value: $name) -> u64 {
                    value.0
                }
            }
        )*
    };
}

opaque_refs! {
    DocumentControllerRef;
    MusicalContextRef;
    RegionSequenceRef;
    AudioSourceRef;
    AudioModificationRef;
    PlaybackRegionRef;
    ContentReaderRef;
    /// A plug-in instance's extension object, registered with the plug-in side stub.
    PlugInExtensionRef;
    PlaybackRendererRef;
    EditorRendererRef;
    EditorViewRef;

    /// Identifies the host-side document controller that callbacks are routed to.
    DocumentControllerHostRef;
    MusicalContextHostRef;
    RegionSequenceHostRef;
    AudioSourceHostRef;
    AudioModificationHostRef;
    PlaybackRegionHostRef;
    AudioReaderHostRef;
    ArchiveReaderHostRef;
    ArchiveWriterHostRef;
    ContentReaderHostRef;
}
