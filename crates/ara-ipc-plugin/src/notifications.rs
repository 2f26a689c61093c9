//! One-way host notifications: model updates and playback requests.

use crate::host_link::HostLink;
use ara_ipc_core::api::{ModelUpdateController, PlaybackController};
use ara_ipc_core::model::{AnalysisProgressState, ContentTimeRange, ContentUpdateFlags};
use ara_ipc_core::refs::{AudioModificationHostRef, AudioSourceHostRef, PlaybackRegionHostRef};
use ara_ipc_core::{AraBool, Selector};

#[derive(Debug)]
pub struct ModelUpdateProxy {
    link: HostLink,
}

impl ModelUpdateProxy {
    pub(crate) fn new(link: HostLink) -> Self {
        Self { link }
    }
}

impl ModelUpdateController for ModelUpdateProxy {
    fn notify_audio_source_analysis_progress(
        &self,
        audio_source: AudioSourceHostRef,
        state: AnalysisProgressState,
        value: f32,
    ) {
        self.link.notify(
            Selector::NotifyAudioSourceAnalysisProgress,
            &(self.link.controller(), audio_source, state, value),
        );
    }

    fn notify_audio_source_content_changed(
        &self,
        audio_source: AudioSourceHostRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    ) {
        self.link.notify(
            Selector::NotifyAudioSourceContentChanged,
            &(self.link.controller(), audio_source, range, flags),
        );
    }

    fn notify_audio_modification_content_changed(
        &self,
        audio_modification: AudioModificationHostRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    ) {
        self.link.notify(
            Selector::NotifyAudioModificationContentChanged,
            &(self.link.controller(), audio_modification, range, flags),
        );
    }

    fn notify_playback_region_content_changed(
        &self,
        playback_region: PlaybackRegionHostRef,
        range: Option<ContentTimeRange>,
        flags: ContentUpdateFlags,
    ) {
        self.link.notify(
            Selector::NotifyPlaybackRegionContentChanged,
            &(self.link.controller(), playback_region, range, flags),
        );
    }

    fn notify_document_data_changed(&self) {
        self.link
            .notify(Selector::NotifyDocumentDataChanged, &self.link.controller());
    }
}

#[derive(Debug)]
pub struct PlaybackControllerProxy {
    link: HostLink,
}

impl PlaybackControllerProxy {
    pub(crate) fn new(link: HostLink) -> Self {
        Self { link }
    }
}

impl PlaybackController for PlaybackControllerProxy {
    fn request_start_playback(&self) {
        self.link
            .notify(Selector::RequestStartPlayback, &self.link.controller());
    }

    fn request_stop_playback(&self) {
        self.link
            .notify(Selector::RequestStopPlayback, &self.link.controller());
    }

    fn request_set_playback_position(&self, time_position: f64) {
        self.link.notify(
            Selector::RequestSetPlaybackPosition,
            &(self.link.controller(), time_position),
        );
    }

    fn request_set_cycle_range(&self, start_time: f64, duration: f64) {
        self.link.notify(
            Selector::RequestSetCycleRange,
            &(self.link.controller(), start_time, duration),
        );
    }

    fn request_enable_cycle(&self, enable: bool) {
        self.link.notify(
            Selector::RequestEnableCycle,
            &(self.link.controller(), AraBool(enable)),
        );
    }
}
