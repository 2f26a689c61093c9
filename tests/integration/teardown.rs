//! Document controller destruction integration tests

use crate::helpers::Fixture;
use ara_ipc::model::PlugInRoles;
use ara_ipc::refs::AudioSourceHostRef;
use ara_ipc::{ControllerState, IpcError, PlugInExtensionProxy};

fn destroy_count(fixture: &Fixture) -> usize {
    fixture
        .factory
        .last_controller()
        .calls()
        .iter()
        .filter(|c| *c == "destroy_document_controller")
        .count()
}

#[test]
fn test_controller_destroyed_before_extension() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let (_extension, extension_ref) = fixture.extension();
    let binding = PlugInExtensionProxy::bind(
        &controller,
        extension_ref,
        PlugInRoles::PLAYBACK_RENDERER,
        PlugInRoles::PLAYBACK_RENDERER,
    )
    .unwrap();
    assert_eq!(controller.extension_count(), 1);

    controller.destroy().unwrap();
    assert_eq!(controller.state(), ControllerState::PendingDestruction);
    assert_eq!(fixture.session.controller_count(), 1);

    binding.destroy().unwrap();
    assert_eq!(controller.state(), ControllerState::Gone);
    assert_eq!(controller.extension_count(), 0);
    assert_eq!(fixture.session.controller_count(), 0);

    // Freed exactly once.
    assert!(!controller.finalize_if_unreferenced());

    fixture.sync();
    assert_eq!(fixture.stub.controller_count(), 0);
    assert_eq!(fixture.stub.extension_count(), 0);
    assert_eq!(destroy_count(&fixture), 1);
}

#[test]
fn test_extension_destroyed_before_controller() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let (_extension, extension_ref) = fixture.extension();
    let binding = PlugInExtensionProxy::bind(
        &controller,
        extension_ref,
        PlugInRoles::EDITOR_VIEW,
        PlugInRoles::EDITOR_VIEW,
    )
    .unwrap();

    binding.destroy().unwrap();
    assert_eq!(controller.state(), ControllerState::Live);
    assert_eq!(fixture.session.controller_count(), 1);

    controller.destroy().unwrap();
    assert_eq!(controller.state(), ControllerState::Gone);
    assert_eq!(fixture.session.controller_count(), 0);
    assert!(!controller.finalize_if_unreferenced());

    fixture.sync();
    assert_eq!(fixture.stub.controller_count(), 0);
    assert_eq!(destroy_count(&fixture), 1);
}

#[test]
fn test_dropped_extension_releases_controller() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let (_extension, extension_ref) = fixture.extension();
    let binding = PlugInExtensionProxy::bind(
        &controller,
        extension_ref,
        PlugInRoles::PLAYBACK_RENDERER,
        PlugInRoles::NONE,
    )
    .unwrap();
    assert!(binding.playback_renderer().is_none());

    controller.destroy().unwrap();
    drop(binding);
    assert_eq!(controller.state(), ControllerState::Gone);

    fixture.sync();
    assert_eq!(fixture.stub.extension_count(), 0);
}

#[test]
fn test_destroy_twice_is_refused() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    controller.destroy().unwrap();
    assert!(matches!(controller.destroy(), Err(IpcError::InvalidState(_))));

    fixture.sync();
    assert_eq!(destroy_count(&fixture), 1);
}

#[test]
fn test_gone_controller_rejects_calls() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(31), 1, 8, false);
    controller.destroy().unwrap();

    assert!(controller.begin_editing().is_err());
    assert!(controller.destroy_audio_source(source).is_err());
    assert!(PlugInExtensionProxy::bind(
        &controller,
        fixture.extension().1,
        PlugInRoles::NONE,
        PlugInRoles::NONE,
    )
    .is_err());
}

#[test]
fn test_session_close_marks_controllers_gone() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    fixture.session.close();
    assert_eq!(controller.state(), ControllerState::Gone);
    assert!(matches!(controller.begin_editing(), Err(IpcError::InvalidState(_))));

    let raw: Result<u32, _> = fixture
        .session
        .connection()
        .call(ara_ipc::Selector::GetFactoriesCount, &());
    assert!(matches!(raw, Err(IpcError::Disconnected)));
}
