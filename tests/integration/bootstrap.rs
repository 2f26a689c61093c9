//! Factory discovery integration tests

use crate::helpers::mock_plugin::{descriptor, MockFactory, COMPATIBLE_ARCHIVE_IDS, DOCUMENT_ARCHIVE_ID, FACTORY_ID};
use crate::helpers::Fixture;
use ara_ipc::model::{DocumentProperties, FactoryDescriptor};
use ara_ipc::{ContentType, IpcError, Selector};

#[test]
fn test_descriptor_survives_later_traffic() {
    let fixture = Fixture::new();
    assert_eq!(fixture.factories.len(), 1);

    let before = fixture.factories.descriptor(0).expect("one factory").clone();
    let ids_before = fixture.factories.descriptor(0).unwrap().compatible_document_archive_ids.as_ptr();
    assert_eq!(before.compatible_document_archive_ids, COMPATIBLE_ARCHIVE_IDS);

    for _ in 0..10 {
        let _: FactoryDescriptor = fixture
            .session
            .connection()
            .call(Selector::GetFactory, &0u32)
            .unwrap();
    }

    let after = fixture.factories.descriptor(0).unwrap();
    assert_eq!(*after, before);
    assert_eq!(after.compatible_document_archive_ids.as_ptr(), ids_before);
    assert_eq!(after.compatible_document_archive_ids[0], "com.example.mock.archive.v1");
    assert_eq!(after.compatible_document_archive_ids[1], "com.example.mock.archive.v2");
}

#[test]
fn test_descriptor_fields() {
    let fixture = Fixture::new();
    let descriptor = fixture.factories.descriptor(0).unwrap();

    assert_eq!(descriptor.factory_id, FACTORY_ID);
    assert_eq!(descriptor.document_archive_id, DOCUMENT_ARCHIVE_ID);
    assert_eq!(descriptor.analyzeable_content_types, vec![ContentType::Notes]);
    assert!(descriptor.supports_storing_audio_file_chunks);
    assert!(descriptor.can_restore("com.example.mock.archive.v1"));
    assert!(!descriptor.can_restore("com.example.other"));
    assert_eq!(fixture.factories.find(FACTORY_ID), Some(0));
    assert_eq!(fixture.factories.find("com.example.missing"), None);
}

#[test]
fn test_empty_compatible_ids() {
    let fixture = Fixture::with_factory(MockFactory::with_descriptor(FactoryDescriptor {
        compatible_document_archive_ids: Vec::new(),
        ..descriptor()
    }));
    let descriptor = fixture.factories.descriptor(0).unwrap();
    assert!(descriptor.compatible_document_archive_ids.is_empty());
    assert!(descriptor.can_restore(DOCUMENT_ARCHIVE_ID));
}

#[test]
fn test_factory_index_out_of_range() {
    let fixture = Fixture::new();
    let result = fixture.factories.create_document_controller(
        3,
        fixture.host.interfaces(),
        &DocumentProperties::default(),
    );
    assert!(matches!(result, Err(IpcError::InvalidArgument(_))));
    assert_eq!(fixture.session.controller_count(), 0);
}

#[test]
fn test_controller_creation_reaches_factory() {
    let fixture = Fixture::new();
    let controller = fixture.controller();

    assert_eq!(fixture.session.controller_count(), 1);
    assert!(!controller.remote_ref().unwrap().is_null());
    assert_eq!(fixture.stub.controller_count(), 1);
    assert_eq!(fixture.factory.last_controller().calls(), vec!["create Test Document"]);
}
