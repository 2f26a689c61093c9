//! Selector space and the few wire records that are not model types.
//!
//! Every remotely callable operation has a fixed `u32` selector: the high 16
//! bits name the interface, the low 16 bits the method. Both processes are
//! built from this table, so an unknown selector can only mean a mismatched
//! build and is treated as fatal.

use crate::codec::ara_bool;
use crate::refs::{EditorRendererRef, EditorViewRef, PlaybackRendererRef};
use serde::{Deserialize, Serialize};

macro_rules! selectors {
    ($(
        $(#[$iface_meta:meta])*
        $interface:ident = $iface_id:literal {
            $( $(#[$meta:meta])* $name:ident = $method:literal, )*
        }
    )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Interface {
            $( $(#[$iface_meta])* $interface = $iface_id, )*
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum Selector {
            $( $( $(#[$meta])* $name = (($iface_id as u32) << 16) | $method, )* )*
        }

        impl Selector {
            pub fn from_raw(raw: u32) -> Option<Self> {
                $( $(
                    if raw == Selector::$name as u32 {
                        return Some(Selector::$name);
                    }
                )* )*
                None
            }

            pub fn interface(self) -> Interface {
                match self {
                    $( $( Selector::$name => Interface::$interface, )* )*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( $( Selector::$name => stringify!($name), )* )*
                }
            }
        }
    };
}

selectors! {
    /// Factory-level entry points (bootstrap and controller creation).
    Factory = 1 {
        GetFactoriesCount = 0,
        GetFactory = 1,
        CreateDocumentController = 2,
    }

    DocumentController = 2 {
        /// One-way.
        DestroyDocumentController = 0,
        BeginEditing = 1,
        EndEditing = 2,
        NotifyModelUpdates = 3,
        RestoreObjectsFromArchive = 4,
        StoreObjectsToArchive = 5,
        StoreAudioSourceToAudioFileChunk = 6,
        UpdateDocumentProperties = 7,
        CreateMusicalContext = 8,
        UpdateMusicalContextProperties = 9,
        UpdateMusicalContextContent = 10,
        DestroyMusicalContext = 11,
        CreateRegionSequence = 12,
        UpdateRegionSequenceProperties = 13,
        DestroyRegionSequence = 14,
        CreateAudioSource = 15,
        UpdateAudioSourceProperties = 16,
        UpdateAudioSourceContent = 17,
        EnableAudioSourceSamplesAccess = 18,
        DeactivateAudioSourceForUndoHistory = 19,
        DestroyAudioSource = 20,
        CreateAudioModification = 21,
        CloneAudioModification = 22,
        UpdateAudioModificationProperties = 23,
        IsAudioModificationPreservingAudioSourceSignal = 24,
        DeactivateAudioModificationForUndoHistory = 25,
        DestroyAudioModification = 26,
        CreatePlaybackRegion = 27,
        UpdatePlaybackRegionProperties = 28,
        GetPlaybackRegionHeadAndTailTime = 29,
        DestroyPlaybackRegion = 30,
        IsAudioSourceContentAvailable = 31,
        GetAudioSourceContentGrade = 32,
        CreateAudioSourceContentReader = 33,
        IsAudioModificationContentAvailable = 34,
        GetAudioModificationContentGrade = 35,
        CreateAudioModificationContentReader = 36,
        IsPlaybackRegionContentAvailable = 37,
        GetPlaybackRegionContentGrade = 38,
        CreatePlaybackRegionContentReader = 39,
        GetContentReaderEventCount = 40,
        GetContentReaderDataForEvent = 41,
        DestroyContentReader = 42,
        IsAudioSourceContentAnalysisIncomplete = 43,
        RequestAudioSourceContentAnalysis = 44,
        GetProcessingAlgorithmsCount = 45,
        GetProcessingAlgorithmProperties = 46,
        GetProcessingAlgorithmForAudioSource = 47,
        RequestProcessingAlgorithmForAudioSource = 48,
    }

    PlaybackRenderer = 3 {
        PlaybackRendererAddPlaybackRegion = 0,
        PlaybackRendererRemovePlaybackRegion = 1,
    }

    EditorRenderer = 4 {
        EditorRendererAddPlaybackRegion = 0,
        EditorRendererRemovePlaybackRegion = 1,
        EditorRendererAddRegionSequence = 2,
        EditorRendererRemoveRegionSequence = 3,
    }

    EditorView = 5 {
        EditorViewNotifySelection = 0,
        EditorViewNotifyHideRegionSequences = 1,
    }

    PlugInExtension = 6 {
        BindToDocumentController = 0,
        DestroyPlugInExtension = 1,
    }

    /// Host callbacks from here on; the first argument is always the
    /// document controller host ref.
    AudioAccess = 7 {
        CreateAudioReaderForSource = 0,
        ReadAudioSamples = 1,
        DestroyAudioReader = 2,
    }

    Archiving = 8 {
        GetArchiveSize = 0,
        ReadBytesFromArchive = 1,
        WriteBytesToArchive = 2,
        /// One-way.
        NotifyDocumentArchivingProgress = 3,
        /// One-way.
        NotifyDocumentUnarchivingProgress = 4,
        GetDocumentArchiveId = 5,
    }

    ContentAccess = 9 {
        HostIsMusicalContextContentAvailable = 0,
        HostGetMusicalContextContentGrade = 1,
        HostCreateMusicalContextContentReader = 2,
        HostIsAudioSourceContentAvailable = 3,
        HostGetAudioSourceContentGrade = 4,
        HostCreateAudioSourceContentReader = 5,
        HostGetContentReaderEventCount = 6,
        HostGetContentReaderDataForEvent = 7,
        HostDestroyContentReader = 8,
    }

    /// All one-way.
    ModelUpdate = 10 {
        NotifyAudioSourceAnalysisProgress = 0,
        NotifyAudioSourceContentChanged = 1,
        NotifyAudioModificationContentChanged = 2,
        NotifyPlaybackRegionContentChanged = 3,
        NotifyDocumentDataChanged = 4,
    }

    /// All one-way.
    PlaybackController = 11 {
        RequestStartPlayback = 0,
        RequestStopPlayback = 1,
        RequestSetPlaybackPosition = 2,
        RequestSetCycleRange = 3,
        RequestEnableCycle = 4,
    }
}

impl Interface {
    /// Interfaces implemented by the host and called by the plug-in.
    pub fn is_host_callback(self) -> bool {
        (self as u16) >= (Interface::AudioAccess as u16)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which optional host interfaces exist for a document controller.
///
/// Audio access and archiving are mandatory and not listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInterfacePresence {
    #[serde(with = "ara_bool")]
    pub content_access: bool,
    #[serde(with = "ara_bool")]
    pub model_update: bool,
    #[serde(with = "ara_bool")]
    pub playback: bool,
}

/// Reply to `BindToDocumentController`: refs for the roles the plug-in took on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionBinding {
    pub playback_renderer: Option<PlaybackRendererRef>,
    pub editor_renderer: Option<EditorRendererRef>,
    pub editor_view: Option<EditorViewRef>,
}
