use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FEEDBACK: &str = r#"{"type":"feedback","feedback_type":"bug","subject":"Flaky login test","content":"fails on CI"}"#;

fn gitbrain(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gitbrain").unwrap();
    cmd.current_dir(dir)
        .env_remove("GITBRAIN_ROLE")
        .env_remove("GITBRAIN_AI_NAME")
        .env_remove("RUST_LOG");
    cmd
}

fn initialized_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    git2::Repository::init(tmp.path()).unwrap();
    gitbrain(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("GitBrain initialized: coder as coder"));
    tmp
}

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    gitbrain(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inbox"))
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("migrate"));
}

#[test]
fn test_requires_git_repository() {
    let tmp = TempDir::new().unwrap();
    gitbrain(tmp.path())
        .arg("count")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not inside a Git repository"));
}

#[test]
fn test_requires_init() {
    let tmp = TempDir::new().unwrap();
    git2::Repository::init(tmp.path()).unwrap();
    gitbrain(tmp.path())
        .arg("count")
        .assert()
        .failure()
        .stderr(predicate::str::contains("gitbrain init"));
}

#[test]
fn test_init_twice_needs_force() {
    let repo = initialized_repo();
    gitbrain(repo.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
    assert!(repo.path().join(".GitBrain/Messages/overseer").is_dir());
    assert!(repo.path().join(".GitBrain/BrainState/coder.json").is_file());
}

#[test]
fn test_send_then_read_as_peer() {
    let repo = initialized_repo();
    gitbrain(repo.path())
        .args(["send", FEEDBACK, "--priority", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("to overseer"));

    gitbrain(repo.path())
        .args(["--role", "overseer", "count"])
        .assert()
        .success()
        .stdout("1\n");
    gitbrain(repo.path())
        .args(["count"])
        .assert()
        .success()
        .stdout("0\n");

    // Listing without --ack leaves the message in place.
    gitbrain(repo.path())
        .args(["--role", "overseer", "inbox"])
        .assert()
        .success()
        .stdout(predicate::str::contains("feedback"))
        .stdout(predicate::str::contains("from coder [p2]"))
        .stdout(predicate::str::contains("Flaky login test"));
    gitbrain(repo.path())
        .args(["--role", "overseer", "--format", "json", "inbox", "--ack"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"recipient\": \"overseer\""));
    gitbrain(repo.path())
        .args(["--role", "overseer", "count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_send_rejects_invalid_content() {
    let repo = initialized_repo();
    gitbrain(repo.path())
        .args(["send", r#"{"type":"feedback","subject":"missing fields"}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to send message"));
    gitbrain(repo.path())
        .args(["send", "not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}

#[test]
fn test_daemon_once_dispatches_and_acknowledges() {
    let repo = initialized_repo();
    gitbrain(repo.path())
        .args(["send", FEEDBACK])
        .assert()
        .success();
    gitbrain(repo.path())
        .args(["--role", "overseer", "daemon", "--once"])
        .assert()
        .success()
        .stdout(predicate::str::contains("feedback [bug] Flaky login test"))
        .stdout(predicate::str::contains("Dispatched 1 messages (0 failed)."));
    gitbrain(repo.path())
        .args(["--role", "overseer", "count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_clear() {
    let repo = initialized_repo();
    for _ in 0..2 {
        gitbrain(repo.path())
            .args(["send", FEEDBACK])
            .assert()
            .success();
    }
    gitbrain(repo.path())
        .args(["--role", "overseer", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 2 messages for overseer."));
}

#[test]
fn test_migrate_then_validate() {
    let repo = initialized_repo();
    let target = TempDir::new().unwrap();
    let source = repo.path().join(".GitBrain");

    gitbrain(repo.path())
        .arg("migrate")
        .arg("--from")
        .arg(&source)
        .arg("--to")
        .arg(target.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Brain states: 1 migrated, 0 failed"))
        .stdout(predicate::str::contains("Total Items: 1"));

    gitbrain(repo.path())
        .arg("validate")
        .arg("--home")
        .arg(target.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Brain States: 1"));
}

#[test]
fn test_migrate_missing_source() {
    let tmp = TempDir::new().unwrap();
    gitbrain(tmp.path())
        .args(["migrate", "--from", "does-not-exist", "--to", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
