//! Sample read integration tests
//!
//! The mock plug-in reads a whole source during analysis into buffers
//! pre-filled with [`SENTINEL`]. Host sources are ramps: channel `c`, frame `i`
//! holds `c + i / 1000`.

use crate::helpers::mock_plugin::SENTINEL;
use crate::helpers::tolerances::{F32_SAMPLE_EPSILON, F64_SAMPLE_EPSILON};
use crate::helpers::Fixture;
use approx::assert_abs_diff_eq;
use ara_ipc::model::SampleFormat;
use ara_ipc::refs::AudioSourceHostRef;
use ara_ipc::ContentEvent;
use ara_ipc::ContentType;

fn ramp(channel: usize, frame: usize) -> f64 {
    channel as f64 + frame as f64 / 1000.0
}

#[test]
fn test_float32_read_fills_caller_buffers() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(41), 2, 64, false);

    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();

    let read = fixture.factory.last_controller().last_read().expect("analysis read");
    assert!(read.ok);
    assert_eq!(read.format, SampleFormat::Float32);
    assert_eq!(read.channels.len(), 2);
    for (c, channel) in read.channels.iter().enumerate() {
        assert_eq!(channel.len(), 64);
        for (i, sample) in channel.iter().enumerate() {
            assert_abs_diff_eq!(*sample, ramp(c, i), epsilon = F32_SAMPLE_EPSILON);
        }
    }
    assert_eq!(fixture.host.open_audio_readers(), 0);
}

#[test]
fn test_float64_read_is_exact() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(42), 3, 100, true);

    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();

    let read = fixture.factory.last_controller().last_read().expect("analysis read");
    assert!(read.ok);
    assert_eq!(read.format, SampleFormat::Float64);
    assert_eq!(read.channels.len(), 3);
    for (c, channel) in read.channels.iter().enumerate() {
        for (i, sample) in channel.iter().enumerate() {
            assert_abs_diff_eq!(*sample, ramp(c, i), epsilon = F64_SAMPLE_EPSILON);
        }
    }

    // Peak of the last channel becomes the note volume.
    let reader = controller
        .create_audio_source_content_reader(source, ContentType::Notes, None)
        .unwrap()
        .expect("notes after analysis");
    let events = controller.content_reader_events(reader).unwrap();
    assert_eq!(events.len(), 1);
    let ContentEvent::Note(note) = &events[0] else {
        panic!("expected a note, got {:?}", events[0]);
    };
    assert_abs_diff_eq!(note.volume as f64, ramp(2, 99), epsilon = F32_SAMPLE_EPSILON);
    controller.destroy_content_reader(reader).unwrap();
}

#[test]
fn test_failed_read_leaves_buffers_untouched() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(43), 2, 16, false);
    fixture.host.set_fail_reads(true);

    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();

    let read = fixture.factory.last_controller().last_read().expect("analysis read");
    assert!(!read.ok);
    assert_eq!(read.channels.len(), 2);
    assert!(read.channels.iter().flatten().all(|sample| *sample == SENTINEL));

    // No content and no content-changed notification.
    assert!(!controller.is_audio_source_content_available(source, ContentType::Notes).unwrap());
    assert!(controller
        .is_audio_source_content_analysis_incomplete(source, ContentType::Notes)
        .unwrap());
    assert_eq!(
        fixture.host.notifications(),
        vec!["analysis 43 Started", "analysis 43 Completed"]
    );
    assert_eq!(fixture.host.open_audio_readers(), 0);
}

#[test]
fn test_failed_float64_read_leaves_buffers_untouched() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(44), 1, 16, true);
    fixture.host.set_fail_reads(true);

    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();

    let read = fixture.factory.last_controller().last_read().expect("analysis read");
    assert!(!read.ok);
    assert_eq!(read.format, SampleFormat::Float64);
    assert!(read.channels.iter().flatten().all(|sample| *sample == SENTINEL));
}

#[test]
fn test_reanalysis_after_recovery() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(45), 1, 16, false);

    fixture.host.set_fail_reads(true);
    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();
    assert!(!controller.is_audio_source_content_available(source, ContentType::Notes).unwrap());

    fixture.host.set_fail_reads(false);
    controller
        .request_audio_source_content_analysis(source, &[ContentType::Notes])
        .unwrap();
    assert!(controller.is_audio_source_content_available(source, ContentType::Notes).unwrap());
}

#[test]
fn test_samples_access_toggle_reaches_plugin() {
    let fixture = Fixture::new();
    let controller = fixture.controller();
    let source = fixture.audio_source(&controller, AudioSourceHostRef(46), 1, 16, false);
    let remote = controller.audio_source_remote_ref(source).unwrap();

    controller.enable_audio_source_samples_access(source, true).unwrap();
    controller.enable_audio_source_samples_access(source, false).unwrap();
    fixture.sync();

    let calls = fixture.factory.last_controller().calls();
    assert!(calls.contains(&format!("samples access {} true", remote.bits())));
    assert!(calls.contains(&format!("samples access {} false", remote.bits())));
}
