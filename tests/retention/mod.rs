use std::fs;
use syncwatch::retention::prune;
use tempfile::tempdir;

fn touch(dir: &std::path::Path, name: &str) {
    fs::write(dir.join(name), name).expect("write");
}

fn listing(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

#[test]
fn removes_oldest_transcripts_only() {
    let dir = tempdir().expect("tempdir");
    for name in [
        "backup-20260101-030000.log",
        "backup-20260102-030000.log",
        "backup-20260102-030000_01.log",
        "backup-20260103-030000.log",
        "history.json",
        "settings.json",
        "backup-manual.log",
    ] {
        touch(dir.path(), name);
    }

    let removed = prune(dir.path(), 2);
    assert_eq!(removed, 2);
    assert_eq!(
        listing(dir.path()),
        [
            "backup-20260102-030000_01.log",
            "backup-20260103-030000.log",
            "backup-manual.log",
            "history.json",
            "settings.json",
        ]
    );
}

#[test]
fn under_the_cap_is_a_no_op() {
    let dir = tempdir().expect("tempdir");
    touch(dir.path(), "backup-20260101-030000.log");
    touch(dir.path(), "backup-20260102-030000.log");

    assert_eq!(prune(dir.path(), 2), 0);
    assert_eq!(listing(dir.path()).len(), 2);
}

#[test]
fn missing_directory_removes_nothing() {
    let dir = tempdir().expect("tempdir");
    assert_eq!(prune(&dir.path().join("absent"), 1), 0);
}

#[test]
fn directories_with_transcript_names_are_skipped() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("backup-20250101-000000.log")).expect("mkdir");
    touch(dir.path(), "backup-20260101-030000.log");

    assert_eq!(prune(dir.path(), 1), 0);
    assert!(dir.path().join("backup-20250101-000000.log").is_dir());
}
