use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const CONFIG: &str = r#"source_path: "./data"
remote_host: "backup@nas.local"
remote_path: "/backups/media"
ssh_key_path: "/keys/id_ed25519"
schedule: "0 3 * * *"
max_log_files: 5
"#;

fn write_config(dir: &Path, body: &str) {
    fs::write(dir.join("syncwatch.yml"), body).expect("write config");
}

fn syncwatch() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("syncwatch");
    cmd.env_remove("SYNCWATCH_LOG").arg("--no-color");
    cmd
}

#[test]
fn validate_json_reports_valid_config() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), CONFIG);

    let out = syncwatch()
        .current_dir(dir.path())
        .args(["validate", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&out).expect("validate json");
    assert_eq!(parsed["valid"], true);
    assert_eq!(parsed["config"], "./syncwatch.yml");
}

#[test]
fn validate_json_reports_bad_schedule() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), "schedule: \"99 * * * *\"\n");

    let out = syncwatch()
        .current_dir(dir.path())
        .args(["validate", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&out).expect("validate json");
    assert_eq!(parsed["valid"], false);
    assert_eq!(parsed["issues"][0]["field"], "schedule");
}

#[test]
fn missing_config_is_a_usage_error() {
    let dir = tempdir().expect("tempdir");

    syncwatch()
        .current_dir(dir.path())
        .args(["history"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("read config"));
}

#[test]
fn history_without_runs() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), CONFIG);

    syncwatch()
        .current_dir(dir.path())
        .args(["history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backup history yet."));
}

#[test]
fn history_rejects_unknown_status_filter() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), CONFIG);

    syncwatch()
        .current_dir(dir.path())
        .args(["history", "--status", "running"])
        .assert()
        .code(2);
}

#[test]
fn read_only_commands_ignore_a_bad_schedule() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), "schedule: \"not a schedule\"\n");
    fs::create_dir(dir.path().join("logs")).expect("mkdir");
    fs::write(
        dir.path().join("logs").join("backup-20260101-030000.log"),
        "=== Backup started ===\n",
    )
    .expect("write transcript");

    syncwatch()
        .current_dir(dir.path())
        .args(["history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backup history yet."));

    syncwatch()
        .current_dir(dir.path())
        .args(["logs", "backup-20260101-030000.log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup started"));

    syncwatch()
        .current_dir(dir.path())
        .args(["validate"])
        .assert()
        .code(2);
}

#[test]
fn run_conflicts_with_an_owner_of_the_log_dir() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), CONFIG);

    let mut settings = syncwatch::config::load(&dir.path().join("syncwatch.yml"))
        .expect("load config")
        .resolve();
    settings.log_dir = dir.path().join("logs");
    let _owner = syncwatch::orchestrator::Orchestrator::new(
        settings,
        Arc::new(syncwatch::invoker::TokioInvoker),
    )
    .expect("orchestrator");

    syncwatch()
        .current_dir(dir.path())
        .args(["run"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("backup already in progress"));
}

#[test]
fn logs_rejects_path_traversal() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), CONFIG);

    syncwatch()
        .current_dir(dir.path())
        .args(["logs", "../syncwatch.yml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid log filename"));
}

#[test]
fn run_requires_transfer_settings() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), "schedule: \"0 3 * * *\"\n");

    syncwatch()
        .current_dir(dir.path())
        .args(["run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing source_path"));
}

#[test]
fn settings_set_then_show() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), "schedule: \"0 3 * * *\"\n");

    syncwatch()
        .current_dir(dir.path())
        .args([
            "settings",
            "set",
            "--source-path",
            "/srv/photos",
            "--remote-host",
            "nas.local",
            "--remote-path",
            "/vault",
            "--ssh-key-path",
            "/keys/id",
        ])
        .assert()
        .success();
    assert!(dir.path().join("logs").join("settings.json").exists());

    let out = syncwatch()
        .current_dir(dir.path())
        .args(["settings", "show", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&out).expect("settings json");
    assert_eq!(parsed["source_path"], "/srv/photos");
    assert_eq!(parsed["remote_host"], "nas.local");
    assert_eq!(parsed["source_is_file"], false);
}

#[test]
fn settings_set_rejects_blank_fields() {
    let dir = tempdir().expect("tempdir");
    write_config(dir.path(), "schedule: \"0 3 * * *\"\n");

    syncwatch()
        .current_dir(dir.path())
        .args(["settings", "set", "--source-path", "/srv/photos"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("remote_host"));
    assert!(!dir.path().join("logs").join("settings.json").exists());
}

#[test]
fn init_refuses_to_overwrite() {
    let dir = tempdir().expect("tempdir");

    syncwatch()
        .current_dir(dir.path())
        .args(["init"])
        .assert()
        .success();

    syncwatch()
        .current_dir(dir.path())
        .args(["validate"])
        .assert()
        .success();

    syncwatch()
        .current_dir(dir.path())
        .args(["init"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn version_prints_package_version() {
    syncwatch()
        .args(["version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[cfg(unix)]
fn fake_rsync(dir: &Path, exit_code: i32) {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-rsync.sh");
    fs::write(
        &path,
        format!("#!/bin/sh\necho \"fake rsync $#\"\nexit {exit_code}\n"),
    )
    .expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[cfg(unix)]
#[test]
fn run_records_partial_transfer_as_warning() {
    let dir = tempdir().expect("tempdir");
    write_config(
        dir.path(),
        &format!("{CONFIG}rsync_path: \"./fake-rsync.sh\"\n"),
    );
    fake_rsync(dir.path(), 24);

    let out = syncwatch()
        .current_dir(dir.path())
        .args(["run", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let record: Value = serde_json::from_slice(&out).expect("run json");
    assert_eq!(record["status"], "warning");
    assert_eq!(record["exit_code"], 24);

    let log_file = record["log_file"].as_str().expect("log file");
    syncwatch()
        .current_dir(dir.path())
        .args(["logs", log_file])
        .assert()
        .success()
        .stdout(predicate::str::contains("fake rsync"))
        .stdout(predicate::str::contains("exit code: 24"));

    let out = syncwatch()
        .current_dir(dir.path())
        .args(["history", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rows: Value = serde_json::from_slice(&out).expect("history json");
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
}

#[cfg(unix)]
#[test]
fn run_failure_exits_non_zero() {
    let dir = tempdir().expect("tempdir");
    write_config(
        dir.path(),
        &format!("{CONFIG}rsync_path: \"./fake-rsync.sh\"\n"),
    );
    fake_rsync(dir.path(), 12);

    syncwatch()
        .current_dir(dir.path())
        .args(["run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error in rsync protocol data stream"));

    syncwatch()
        .current_dir(dir.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"failed\""));
}
