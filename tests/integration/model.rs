//! Object identity, validity and call shape integration tests

use crate::helpers::Fixture;
use ara_ipc::core::codec::decode;
use ara_ipc::model::{
    AudioModificationProperties, MusicalContextProperties, PlaybackRegionProperties, PlugInRoles,
    RegionSequenceProperties,
};
use ara_ipc::refs::{
    AudioModificationHostRef, AudioSourceHostRef, AudioSourceRef, DocumentControllerRef, MusicalContextHostRef,
    PlaybackRegionHostRef, RegionSequenceHostRef,
};
use ara_ipc::{ContentType, IpcError, PlugInExtensionProxy, Selector};

#[test]
fn test_content_query_is_one_message_with_plugin_refs() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(11), 1, 16, false);

    let controller_ref = controller.remote_ref().unwrap();
    let source_ref = controller.audio_source_remote_ref(source).unwrap();

    fixture.clear_messages();
    let available = controller
        .is_audio_source_content_available(source, ContentType::Notes)
        .unwrap();
    assert!(!available);

    let messages = fixture.messages();
    assert_eq!(messages.len(), 1);
    let (selector, payload) = &messages[0];
    assert_eq!(*selector, Selector::IsAudioSourceContentAvailable);
    let args: (DocumentControllerRef, AudioSourceRef, ContentType) = decode(payload).unwrap();
    assert_eq!(args, (controller_ref, source_ref, ContentType::Notes));
}

#[test]
fn test_destroyed_audio_source_is_rejected_on_both_sides() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(11), 1, 16, false);
    let controller_ref = controller.remote_ref().unwrap();
    let source_ref = controller.audio_source_remote_ref(source).unwrap();

    assert!(controller.is_audio_source_valid(source));
    controller.destroy_audio_source(source).unwrap();
    assert!(!controller.is_audio_source_valid(source));
    assert_eq!(controller.audio_source_count(), 0);

    // Rejected locally, nothing is sent.
    fixture.clear_messages();
    let result = controller.is_audio_source_content_available(source, ContentType::Notes);
    assert!(matches!(result, Err(IpcError::StaleHandle { .. })));
    assert!(fixture.messages().is_empty());

    // A hand-built message with the old plug-in ref is refused by the stub.
    let raw: Result<ara_ipc::AraBool, _> = fixture.session.connection().call(
        Selector::IsAudioSourceContentAvailable,
        &(controller_ref, source_ref, ContentType::Notes),
    );
    assert!(matches!(raw, Err(IpcError::RemoteFault(_))));
    assert_eq!(fixture.factory.last_controller().audio_source_count(), 0);
}

#[test]
fn test_handle_of_another_kind_is_stale() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(11), 1, 16, false);

    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();
    let reader = controller
        .create_audio_source_content_reader(source, ContentType::Notes, None)
        .unwrap()
        .expect("notes after analysis");

    // Reader bits presented as an audio source.
    let result = controller.is_audio_source_content_available(AudioSourceRef(reader.bits()), ContentType::Notes);
    assert!(matches!(result, Err(IpcError::StaleHandle { .. })));
    assert!(controller.is_audio_source_valid(source));
}

#[test]
fn test_audio_source_identity_round_trip() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let first = fixture.audio_source(&controller, AudioSourceHostRef(11), 2, 16, false);
    let second = fixture.audio_source(&controller, AudioSourceHostRef(12), 1, 16, false);
    assert_ne!(first, second);
    assert_eq!(controller.audio_source_count(), 2);

    let mock = fixture.factory.last_controller();
    let first_remote = controller.audio_source_remote_ref(first).unwrap();
    // The plug-in holds the host's local handle and gets it back unchanged.
    assert_eq!(mock.audio_source_host_ref(first_remote), Some(AudioSourceHostRef(first.bits())));
}

#[test]
fn test_zero_channel_audio_source_is_refused() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let properties = ara_ipc::model::AudioSourceProperties {
        persistent_id: "silent".into(),
        channel_count: 0,
        ..Default::default()
    };
    fixture.clear_messages();
    let result = controller.create_audio_source(AudioSourceHostRef(1), &properties);
    assert!(matches!(result, Err(IpcError::InvalidArgument(_))));
    assert!(fixture.messages().is_empty());
}

#[test]
fn test_model_graph_and_renderer_roles() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(11), 1, 480, false);

    let context = controller
        .create_musical_context(MusicalContextHostRef(1), &MusicalContextProperties::default())
        .unwrap();
    let sequence = controller
        .create_region_sequence(
            RegionSequenceHostRef(1),
            &RegionSequenceProperties {
                musical_context: context,
                ..Default::default()
            },
        )
        .unwrap();
    let modification = controller
        .create_audio_modification(source, AudioModificationHostRef(1), &AudioModificationProperties::default())
        .unwrap();
    let region = controller
        .create_playback_region(
            modification,
            PlaybackRegionHostRef(1),
            &PlaybackRegionProperties {
                musical_context: context,
                region_sequence: sequence,
                duration_in_playback_time: 0.01,
                ..Default::default()
            },
        )
        .unwrap();

    let head_tail = controller.get_playback_region_head_and_tail_time(region).unwrap();
    assert_eq!(head_tail.tail_time, 0.5);

    let (extension, extension_ref) = fixture.extension();
    let known = PlugInRoles::PLAYBACK_RENDERER | PlugInRoles::EDITOR_RENDERER | PlugInRoles::EDITOR_VIEW;
    let assigned = PlugInRoles::PLAYBACK_RENDERER | PlugInRoles::EDITOR_RENDERER;
    let binding = PlugInExtensionProxy::bind(&controller, extension_ref, known, assigned).unwrap();
    assert!(binding.playback_renderer().is_some());
    assert!(binding.editor_renderer().is_some());
    assert!(binding.editor_view().is_none());

    binding.playback_renderer().unwrap().add_playback_region(region).unwrap();
    binding.editor_renderer().unwrap().add_region_sequence(sequence).unwrap();
    assert_eq!(extension.playback_renderer().regions(), vec![region]);
    assert_eq!(extension.editor_renderer().sequences(), vec![sequence]);

    binding.playback_renderer().unwrap().remove_playback_region(region).unwrap();
    assert!(extension.playback_renderer().regions().is_empty());

    // A destroyed region never reaches the renderer.
    controller.destroy_playback_region(region).unwrap();
    let result = binding.playback_renderer().unwrap().add_playback_region(region);
    assert!(matches!(result, Err(IpcError::RemoteFault(_))));
    assert!(extension.playback_renderer().regions().is_empty());

    binding.destroy().unwrap();
}

#[test]
fn test_bound_extension_outlives_controller_destroy() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(12), 1, 48, false);
    let modification = controller
        .create_audio_modification(source, AudioModificationHostRef(2), &AudioModificationProperties::default())
        .unwrap();
    let region = controller
        .create_playback_region(modification, PlaybackRegionHostRef(2), &PlaybackRegionProperties::default())
        .unwrap();

    let (extension, extension_ref) = fixture.extension();
    let binding = PlugInExtensionProxy::bind(
        &controller,
        extension_ref,
        PlugInRoles::PLAYBACK_RENDERER,
        PlugInRoles::PLAYBACK_RENDERER,
    )
    .unwrap();

    controller.destroy().unwrap();
    binding.playback_renderer().unwrap().add_playback_region(region).unwrap();
    assert_eq!(extension.playback_renderer().regions(), vec![region]);
    binding.playback_renderer().unwrap().remove_playback_region(region).unwrap();
    assert!(extension.playback_renderer().regions().is_empty());

    let destroyed = |fixture: &Fixture| {
        fixture
            .factory
            .last_controller()
            .calls()
            .contains(&"destroy_document_controller".to_string())
    };
    assert!(!destroyed(&fixture));
    assert_eq!(fixture.stub.controller_count(), 1);

    binding.destroy().unwrap();
    fixture.sync();
    assert!(destroyed(&fixture));
    assert_eq!(fixture.stub.controller_count(), 0);
}

#[test]
fn test_processing_algorithms() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(11), 1, 16, false);

    assert_eq!(controller.get_processing_algorithms_count().unwrap(), 3);
    let properties = controller.get_processing_algorithm_properties(2).unwrap().unwrap();
    assert_eq!(properties.persistent_id, "com.example.mock.algorithm2");

    controller.request_processing_algorithm_for_audio_source(source, 1).unwrap();
    assert_eq!(controller.get_processing_algorithm_for_audio_source(source).unwrap(), 1);

    let result = controller.request_processing_algorithm_for_audio_source(source, 3);
    assert!(result.is_err());
    assert_eq!(controller.get_processing_algorithm_for_audio_source(source).unwrap(), 1);
}
