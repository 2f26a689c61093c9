//! Nested call integration tests
//!
//! Host call A (analysis) makes the plug-in read samples (B). While serving B
//! the host calls back into the plug-in (C). C must complete inside B, and B
//! inside A.

use crate::helpers::Fixture;
use ara_ipc::refs::AudioSourceHostRef;
use ara_ipc::ContentType;
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn test_nested_calls_complete_inside_out() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(21), 1, 32, false);

    let order = Arc::new(Mutex::new(Vec::<String>::new()));
    {
        let order = order.clone();
        let controller = controller.clone();
        fixture.host.set_read_hook(Some(Box::new(move || {
            order.lock().push("B begin".into());
            let count = controller.get_processing_algorithms_count().expect("nested call");
            order.lock().push(format!("C returned {count}"));
        })));
    }

    order.lock().push("A begin".into());
    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();
    order.lock().push("A returned".into());
    fixture.host.set_read_hook(None);

    assert_eq!(
        *order.lock(),
        vec!["A begin", "B begin", "C returned 3", "A returned"]
    );

    let remote = controller.audio_source_remote_ref(source).unwrap();
    let calls = fixture.factory.last_controller().calls();
    let begin = calls
        .iter()
        .position(|c| *c == format!("analysis begin {}", remote.bits()))
        .expect("analysis started");
    let nested = calls
        .iter()
        .position(|c| c == "get_processing_algorithms_count")
        .expect("nested call reached the plug-in");
    let end = calls
        .iter()
        .position(|c| *c == format!("analysis end {}", remote.bits()))
        .expect("analysis finished");
    assert!(begin < nested && nested < end);

    // The outer call still produced its result.
    assert!(controller.is_audio_source_content_available(source, ContentType::Notes).unwrap());
}

#[test]
fn test_nested_call_failure_does_not_poison_outer_call() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(21), 1, 32, false);

    let nested_failed = Arc::new(Mutex::new(false));
    {
        let nested_failed = nested_failed.clone();
        let controller = controller.clone();
        fixture.host.set_read_hook(Some(Box::new(move || {
            let result = controller.request_processing_algorithm_for_audio_source(source, 9);
            *nested_failed.lock() = result.is_err();
        })));
    }

    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();
    fixture.host.set_read_hook(None);

    assert!(*nested_failed.lock());
    assert!(controller.is_audio_source_content_available(source, ContentType::Notes).unwrap());
}

#[test]
fn test_callbacks_during_analysis_are_ordered() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(21), 1, 32, false);

    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();

    // Notifications arrive with the app's own host ref, not the wire handle.
    assert_eq!(
        fixture.host.notifications(),
        vec![
            "analysis 21 Started",
            "audio source content changed 21",
            "analysis 21 Completed",
        ]
    );
    assert_eq!(fixture.host.open_audio_readers(), 0);
}
