//! `FileEventStore` against a real directory.

use std::sync::Arc;

use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::event::AggregateId;
use chronicle_core::repository::Repository;
use chronicle_core::store::{ConcurrencyPolicy, EventStore};
use chronicle_event_store::{EventStoreConfig, FileEventStore, RecordName};
use chronicle_test_support::{TestDomain, TestDomainEvent, test_domain_registry};
use uuid::Uuid;

fn open(dir: &tempfile::TempDir, policy: ConcurrencyPolicy) -> FileEventStore<TestDomainEvent> {
    let config = EventStoreConfig::new(dir.path()).with_policy(policy);
    FileEventStore::from_config(&config, Arc::new(test_domain_registry())).unwrap()
}

fn record_files(dir: &tempfile::TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_saved_events_land_as_named_record_files() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, ConcurrencyPolicy::StrictlyGreater);
    let id = Uuid::new_v4();
    let key = id.stream_key();

    // Act
    store
        .save_events(
            &key,
            &mut [
                TestDomainEvent::created(id),
                TestDomainEvent::data_changed("written"),
            ],
            -1,
        )
        .await
        .unwrap();

    // Assert
    let names = record_files(&dir);
    assert_eq!(names.len(), 2);
    let parsed: Vec<RecordName> = names
        .iter()
        .map(|name| RecordName::parse(name).unwrap())
        .collect();
    assert!(parsed.iter().all(|name| name.stream_key == key));
    assert_eq!(parsed[0].version, 0);
    assert_eq!(parsed[1].version, 1);
    assert!(parsed[0].timestamp < parsed[1].timestamp);
}

#[tokio::test]
async fn test_events_survive_reopening_the_store() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let id = Uuid::new_v4();
    {
        let store = open(&dir, ConcurrencyPolicy::StrictlyGreater);
        store
            .save_events(&id.stream_key(), &mut [TestDomainEvent::created(id)], -1)
            .await
            .unwrap();
    }

    // Act
    let reopened = open(&dir, ConcurrencyPolicy::StrictlyGreater);
    let events = reopened.get_events_by_id(&id.stream_key()).await.unwrap();
    let ids = reopened.get_all_events().await.unwrap();

    // Assert
    assert_eq!(events, vec![TestDomainEvent {
        version: 0,
        ..TestDomainEvent::created(id)
    }]);
    assert_eq!(ids.len(), 1);
    assert!(reopened.get_event(ids[0]).await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_root_directory_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = EventStoreConfig::new(dir.path().join("not-yet-created"));
    let store: FileEventStore<TestDomainEvent> =
        FileEventStore::from_config(&config, Arc::new(test_domain_registry())).unwrap();

    assert!(store.get_all_events().await.unwrap().is_empty());
    assert!(
        store
            .get_events_by_id(&Uuid::new_v4().stream_key())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_unrelated_files_in_root_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("README.txt"), "not a record").unwrap();
    let store = open(&dir, ConcurrencyPolicy::StrictlyGreater);

    assert!(store.get_all_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repository_over_file_system_store() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&dir, ConcurrencyPolicy::ExactMatch));
    let repository = Repository::<TestDomain>::new(store);
    let id = Uuid::new_v4();
    let mut domain = TestDomain::create(id);
    domain.do_some_changes();

    // Act
    repository.save(&mut domain).await.unwrap();
    let loaded = repository.get_by_id(id).await.unwrap();

    // Assert
    assert!(loaded.is_created());
    assert_eq!(loaded.version(), domain.version());
    assert_eq!(loaded.data(), domain.data());
    assert_eq!(record_files(&dir).len(), usize::try_from(domain.version() + 1).unwrap());
}
