#![allow(deprecated)]
use assert_cmd::Command;
use chrono::Utc;
use expiry_core::{
    cluster::{ClusterSnapshot, ClusterState},
    expiring::{ExpiringAction, ExpiringActionDb, ExpiringApiRequest, ExpiringPayload},
    paths,
    ports::ExpiringActionStore,
    request::Request,
    types::RequestState,
};
use predicates::prelude::*;
use tempfile::TempDir;

fn expiry(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("expiry").unwrap();
    cmd.current_dir(dir.path()).env("EXPIRY_ROOT", dir.path());
    cmd
}

fn seed_cluster(dir: &TempDir) {
    let mut snapshot = ClusterSnapshot::default();
    snapshot.insert_request(Request::new("web", 3), RequestState::Paused);
    snapshot.insert_request(Request::new("api", 10), RequestState::Active);
    ClusterState::new(snapshot).save(dir.path()).unwrap();
}

/// Store an expired pause on `web` and a far-future scale on `api`.
fn seed_actions(dir: &TempDir) {
    let now = Utc::now().timestamp_millis();
    // The handle must be dropped before the binary opens the same file.
    let db = ExpiringActionDb::open(&paths::expiring_db_path(dir.path())).unwrap();
    db.save_expiring(&ExpiringAction::new(
        "web",
        "alice",
        now - 60_000,
        ExpiringApiRequest::new(Some(1_000), None),
        ExpiringPayload::Pause,
    ))
    .unwrap();
    db.save_expiring(&ExpiringAction::new(
        "api",
        "bob",
        now,
        ExpiringApiRequest::new(Some(3_600_000), Some("load test".into())),
        ExpiringPayload::Scale {
            revert_to_instances: 4,
        },
    ))
    .unwrap();
}

fn list_json(dir: &TempDir) -> Vec<serde_json::Value> {
    let output = expiry(dir).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// expiry list
// ---------------------------------------------------------------------------

#[test]
fn list_on_empty_store_succeeds() {
    let dir = TempDir::new().unwrap();
    expiry(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No expiring actions."));
}

#[test]
fn list_json_reports_due_flag() {
    let dir = TempDir::new().unwrap();
    seed_actions(&dir);

    let entries = list_json(&dir);
    assert_eq!(entries.len(), 2);

    let pause = entries.iter().find(|e| e["request_id"] == "web").unwrap();
    assert_eq!(pause["due"], true);
    let scale = entries.iter().find(|e| e["request_id"] == "api").unwrap();
    assert_eq!(scale["due"], false);
    assert_eq!(scale["payload"]["revert_to_instances"], 4);
}

#[test]
fn list_filters_by_kind() {
    let dir = TempDir::new().unwrap();
    seed_actions(&dir);

    expiry(&dir)
        .args(["list", "--kind", "scale"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api"))
        .stdout(predicate::str::contains("web").not());
}

#[test]
fn list_rejects_unknown_kind() {
    let dir = TempDir::new().unwrap();
    expiry(&dir)
        .args(["list", "--kind", "delete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// expiry poll
// ---------------------------------------------------------------------------

#[test]
fn poll_without_cluster_state_fails() {
    let dir = TempDir::new().unwrap();
    expiry(&dir)
        .arg("poll")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load cluster state"));
}

#[test]
fn poll_reverts_due_actions_and_persists_state() {
    let dir = TempDir::new().unwrap();
    seed_cluster(&dir);
    seed_actions(&dir);

    expiry(&dir).arg("poll").assert().success();

    let cluster = ClusterState::load(dir.path()).unwrap().snapshot().unwrap();
    assert_eq!(cluster.requests["web"].state, RequestState::Active);
    assert_eq!(cluster.requests["api"].request.instances, 10);

    let remaining = list_json(&dir);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["request_id"], "api");
}

#[test]
fn poll_json_reports_every_kind() {
    let dir = TempDir::new().unwrap();
    seed_cluster(&dir);
    seed_actions(&dir);

    let output = expiry(&dir).args(["poll", "--json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let kinds = report["kinds"].as_array().unwrap();
    let names: Vec<&str> = kinds.iter().map(|k| k["kind"].as_str().unwrap()).collect();
    assert_eq!(names, ["bounce", "pause", "scale", "skip_healthchecks"]);

    let pause = &kinds[1];
    assert_eq!(pause["applied"], 1);
    assert_eq!(pause["deleted"], 1);
    assert_eq!(kinds[2]["not_due"], 1);
}

#[test]
fn daemon_with_zero_interval_exits() {
    let dir = TempDir::new().unwrap();
    seed_cluster(&dir);

    expiry(&dir)
        .args(["daemon", "--every-millis", "0"])
        .assert()
        .success();
}
