use crate::support;
use std::fs;
use syncwatch::history::{Filter, MAX_ENTRIES, Store, encode, prepend, seed_status};
use syncwatch::model::{BackupStatus, RunRecord};
use tempfile::tempdir;
use time::OffsetDateTime;

#[test]
fn load_missing_file_is_empty() {
    let dir = tempdir().expect("tempdir");
    let store = Store::in_dir(dir.path());
    assert!(store.load().is_empty());
    assert!(!store.path().exists());
}

#[test]
fn load_malformed_file_is_empty() {
    let dir = tempdir().expect("tempdir");
    let store = Store::in_dir(dir.path());
    fs::write(store.path(), "[{\"id\": 3").expect("write");
    assert!(store.load().is_empty());
}

#[test]
fn append_prepends_and_persists() {
    let dir = tempdir().expect("tempdir");
    let store = Store::in_dir(&dir.path().join("nested"));
    let mut history = Vec::new();

    store
        .append(&mut history, support::completed_record("1", BackupStatus::Success))
        .expect("append first");
    store
        .append(&mut history, support::completed_record("2", BackupStatus::Failed))
        .expect("append second");

    assert_eq!(history[0].id, "2");
    let loaded = store.load();
    assert_eq!(loaded, history);
    assert!(!store.path().with_extension("json.tmp").exists());
}

#[test]
fn append_drops_oldest_beyond_cap() {
    let dir = tempdir().expect("tempdir");
    let store = Store::in_dir(dir.path());
    let mut history = Vec::new();

    for i in 0..MAX_ENTRIES + 5 {
        store
            .append(
                &mut history,
                support::completed_record(&i.to_string(), BackupStatus::Success),
            )
            .expect("append");
    }

    assert_eq!(history.len(), MAX_ENTRIES);
    assert_eq!(history[0].id, (MAX_ENTRIES + 4).to_string());
    assert_eq!(history[MAX_ENTRIES - 1].id, "5");
    assert_eq!(store.load().len(), MAX_ENTRIES);
}

#[test]
fn list_filters_by_status_and_limit() {
    let dir = tempdir().expect("tempdir");
    let store = Store::in_dir(dir.path());
    let mut history = Vec::new();
    for (id, status) in [
        ("a", BackupStatus::Success),
        ("b", BackupStatus::Failed),
        ("c", BackupStatus::Warning),
        ("d", BackupStatus::Failed),
    ] {
        store
            .append(&mut history, support::completed_record(id, status))
            .expect("append");
    }

    let failed = store.list(&Filter {
        status: Some(BackupStatus::Failed),
        ..Filter::default()
    });
    let ids: Vec<_> = failed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["d", "b"]);

    let limited = store.list(&Filter {
        limit: Some(2),
        ..Filter::default()
    });
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, "d");
}

#[test]
fn file_format_uses_rfc3339_and_lowercase_status() {
    let dir = tempdir().expect("tempdir");
    let store = Store::in_dir(dir.path());
    let mut record = support::completed_record("20260101-030000", BackupStatus::Warning);
    record.exit_code = 23;
    store.save(&[record]).expect("save");

    let raw: serde_json::Value =
        serde_json::from_slice(&fs::read(store.path()).expect("read")).expect("json");
    let entry = &raw[0];
    assert_eq!(entry["status"], "warning");
    assert_eq!(entry["exit_code"], 23);
    assert_eq!(entry["log_file"], "backup-20260101-030000.log");
    assert!(entry["start_time"].as_str().is_some_and(|s| s.contains('T')));
    assert!(entry["end_time"].is_string());
}

#[test]
fn seed_status_ignores_stray_running_entry() {
    assert_eq!(seed_status(&[]), BackupStatus::Idle);

    let running = RunRecord::started(
        "x".to_string(),
        "backup-x.log".to_string(),
        OffsetDateTime::now_utc(),
    );
    assert_eq!(seed_status(&[running]), BackupStatus::Idle);

    let failed = support::completed_record("y", BackupStatus::Failed);
    assert_eq!(seed_status(&[failed]), BackupStatus::Failed);
}

#[test]
fn encoded_history_writes_like_save() {
    let dir = tempdir().expect("tempdir");
    let store = Store::in_dir(&dir.path().join("logs"));
    let mut history = vec![support::completed_record("old", BackupStatus::Success)];

    prepend(
        &mut history,
        support::completed_record("new", BackupStatus::Failed),
    );
    let data = encode(&history).expect("encode");
    store.write(&data).expect("write");

    let loaded = store.load();
    assert_eq!(loaded, history);
    assert_eq!(loaded[0].id, "new");
    assert_eq!(seed_status(&loaded), BackupStatus::Failed);
}
