//! Integration tests for the courrier crate
//!
//! These tests drive several registers over shared storage and one sync bus.

use std::sync::Arc;

use courrier::{
    Category, Courrier, CourrierDraft, CourrierError, CourrierId, CourriersUpdated,
    CourrierStore, FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, ManualClock, Patch,
    Settings, SyncBus,
};
use serde_json::json;
use tempfile::TempDir;

/// Helper bundling shared storage, bus and clock
struct Harness {
    storage: Arc<dyn KeyValueStore>,
    bus: SyncBus,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn in_memory() -> Self {
        Self::with_storage(Arc::new(InMemoryKeyValueStore::new()))
    }

    fn with_storage(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            bus: SyncBus::default(),
            clock: Arc::new(ManualClock::at_millis(1_717_200_000_000)),
        }
    }

    fn open(&self, category: Category) -> CourrierStore {
        CourrierStore::open(category, self.storage.clone(), self.bus.clone())
            .with_clock(self.clock.clone())
    }

    /// Add a courrier with a subject, then step the clock so ids stay unique
    fn add(&self, store: &mut CourrierStore, subject: &str) -> Courrier {
        let courrier = store.add(CourrierDraft::new().field("subject", subject));
        self.clock.advance_millis(1);
        courrier
    }
}

fn subjects(store: &CourrierStore) -> Vec<String> {
    store
        .courriers()
        .iter()
        .filter_map(|c| c.field("subject").and_then(|v| v.as_str()).map(String::from))
        .collect()
}

#[test]
fn test_register_scenario() {
    let h = Harness::in_memory();
    let mut store = h.open(Category::Arrive);
    assert!(store.is_empty());

    let a = h.add(&mut store, "A");
    assert_eq!(subjects(&store), vec!["A"]);

    let b = h.add(&mut store, "B");
    assert_eq!(subjects(&store), vec!["B", "A"]);

    store.update_status(a.id, "processed");
    assert_eq!(store.get(a.id).unwrap().status(), Some("processed"));
    assert_eq!(store.get(b.id), Some(&b));
}

#[test]
fn test_add_then_load_returns_content_and_generated_fields() {
    let h = Harness::in_memory();
    let mut store = h.open(Category::Depart);

    let draft = CourrierDraft::try_from(json!({
        "subject": "Demande de subvention",
        "destinataire": "Prefecture",
        "pieces": 3
    }))
    .unwrap();
    store.add(draft.clone());

    store.load();
    let first = &store.courriers()[0];
    assert_eq!(&first.fields, draft.fields());
    assert_eq!(first.id, CourrierId(1_717_200_000_000));
    assert_eq!(first.created_at.timestamp_millis(), 1_717_200_000_000);
    assert_eq!(first.updated_at, first.created_at);
    assert_eq!(first.category, Category::Depart);
}

#[test]
fn test_save_load_round_trip() {
    let h = Harness::in_memory();
    let mut writer = h.open(Category::Arrive);
    let a = h.add(&mut writer, "A");
    let b = h.add(&mut writer, "B");
    let collection = vec![a, b];

    writer.save(collection.clone());

    let mut reader = h.open(Category::Arrive);
    reader.load();
    assert_eq!(reader.courriers(), collection.as_slice());
}

#[test]
fn test_update_changes_only_target_and_advances_timestamp() {
    let h = Harness::in_memory();
    let mut store = h.open(Category::Arrive);
    let a = h.add(&mut store, "A");
    let b = h.add(&mut store, "B");
    let c = h.add(&mut store, "C");
    h.clock.advance_millis(250);

    let patch: Patch = json!({ "subject": "B'", "reference": "2024/17" })
        .as_object()
        .cloned()
        .unwrap();
    store.update(b.id, &patch);

    let updated = store.get(b.id).unwrap();
    assert_eq!(updated.field("reference"), Some(&json!("2024/17")));
    assert!(updated.updated_at > b.updated_at);
    assert_eq!(store.get(a.id), Some(&a));
    assert_eq!(store.get(c.id), Some(&c));
    assert_eq!(subjects(&store), vec!["C", "B'", "A"]);
}

#[test]
fn test_remove_present_and_absent() {
    let h = Harness::in_memory();
    let mut store = h.open(Category::Arrive);
    let a = h.add(&mut store, "A");
    h.add(&mut store, "B");

    store.remove(CourrierId(1));
    assert_eq!(store.len(), 2);

    store.remove(a.id);
    assert_eq!(store.len(), 1);
    assert_eq!(subjects(&store), vec!["B"]);
}

#[test]
fn test_corrupt_partition_degrades_to_empty() {
    let h = Harness::in_memory();
    h.storage
        .set("nbh_courriers_arrive", "[{\"id\": \"oops\"")
        .unwrap();

    let mut store = h.open(Category::Arrive);
    assert!(store.is_empty());
    assert!(!store.is_loading());

    assert!(matches!(store.try_load(), Err(CourrierError::Corrupt { .. })));
}

#[test]
fn test_save_propagates_to_same_category_only() {
    let h = Harness::in_memory();
    let mut writer = h.open(Category::Arrive);
    let mut sibling = h.open(Category::Arrive);
    let mut other = h.open(Category::Depart);

    h.add(&mut writer, "A");

    assert!(sibling.is_empty());
    assert!(sibling.process_notifications());
    assert_eq!(subjects(&sibling), vec!["A"]);

    assert!(!other.process_notifications());
    assert!(other.is_empty());
}

#[test]
fn test_reload_reads_storage_not_payload() {
    let h = Harness::in_memory();
    let mut writer = h.open(Category::Arrive);
    let mut sibling = h.open(Category::Arrive);

    h.add(&mut writer, "A");
    // Storage changes again after the broadcast was sent
    h.storage.set("nbh_courriers_arrive", "[]").unwrap();

    assert!(sibling.process_notifications());
    assert!(sibling.is_empty());
}

#[test]
fn test_uncategorized_update_reloads_every_register() {
    let h = Harness::in_memory();
    let mut arrive = h.open(Category::Arrive);
    let mut depart = h.open(Category::Depart);

    h.bus.publish_update(CourriersUpdated::broadcast());

    assert!(arrive.process_notifications());
    assert!(depart.process_notifications());
}

#[test]
fn test_storage_change_signal_reloads_unconditionally() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(FileKeyValueStore::new(dir.path()).unwrap());
    let h = Harness::with_storage(storage.clone());
    let mut arrive = h.open(Category::Arrive);
    let mut depart = h.open(Category::Depart);

    // Another process rewrites the file behind our back
    let external = FileKeyValueStore::new(dir.path()).unwrap();
    external
        .set(
            "nbh_courriers_depart",
            r#"[{"id":5,"createdAt":"2024-06-01T00:00:00.000Z","updatedAt":"2024-06-01T00:00:00.000Z","type":"DEPART","subject":"Externe"}]"#,
        )
        .unwrap();
    h.bus.notify_storage_changed(None);

    assert!(arrive.process_notifications());
    assert!(depart.process_notifications());
    assert_eq!(subjects(&depart), vec!["Externe"]);
    assert!(arrive.is_empty());
}

#[test]
fn test_deactivated_register_stops_following() {
    let h = Harness::in_memory();
    let mut writer = h.open(Category::Arrive);
    let mut reader = h.open(Category::Arrive);
    reader.deactivate();

    h.add(&mut writer, "A");

    assert!(!reader.process_notifications());
    assert!(reader.is_empty());

    reader.activate();
    assert_eq!(subjects(&reader), vec!["A"]);
}

#[test]
fn test_dropping_register_unsubscribes() {
    let h = Harness::in_memory();
    let store = h.open(Category::Arrive);
    assert_eq!(h.bus.subscriber_count(), 1);

    drop(store);
    assert_eq!(h.bus.subscriber_count(), 0);
}

#[test]
fn test_quota_failure_is_silent() {
    let h = Harness::with_storage(Arc::new(InMemoryKeyValueStore::with_quota(512)));
    let mut writer = h.open(Category::Arrive);
    let mut sibling = h.open(Category::Arrive);
    let a = h.add(&mut writer, "A");
    assert!(sibling.process_notifications());

    let returned = writer.add(CourrierDraft::new().field("subject", "x".repeat(1024)));

    assert_eq!(returned.category, Category::Arrive);
    assert_eq!(writer.courriers(), std::slice::from_ref(&a));
    assert!(!sibling.process_notifications());
}

#[test]
fn test_stale_writers_lose_updates() {
    let h = Harness::in_memory();
    let mut first = h.open(Category::Arrive);
    let mut second = h.open(Category::Arrive);

    // Neither drains the bus before writing, so both write from an empty cache
    h.add(&mut first, "A");
    h.add(&mut second, "B");

    first.process_notifications();
    assert_eq!(subjects(&first), vec!["B"]);
}

#[test]
fn test_file_backed_registers_survive_restart() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        data_dir: dir.path().join("data"),
        quota_bytes: None,
        bus_capacity: 8,
    };

    {
        let storage: Arc<dyn KeyValueStore> = Arc::new(settings.open_storage().unwrap());
        let h = Harness::with_storage(storage);
        let mut store = h.open(Category::Depart);
        h.add(&mut store, "Courrier sortant");
    }

    let storage: Arc<dyn KeyValueStore> = Arc::new(settings.open_storage().unwrap());
    let store = CourrierStore::open(Category::Depart, storage, settings.create_bus());
    assert_eq!(subjects(&store), vec!["Courrier sortant"]);
    assert!(dir.path().join("data/nbh_courriers_depart.json").exists());
}
