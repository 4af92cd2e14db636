//! CLI command integration tests. Every run uses the lexical backend and a
//! fixed seed unless a test says otherwise.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn chord_cmd() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("chord").unwrap();
    cmd.env_remove("CHORD_CONFIG").env_remove("RUST_LOG");
    cmd.args(["--seed", "7"]);
    cmd
}

#[test]
fn say_remembers_name() {
    chord_cmd()
        .args(["say", "My name is Alice", "What is my name?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Your name is Alice."));
}

#[test]
fn say_remembers_pet() {
    chord_cmd()
        .args(["say", "My dog's name is Buddy", "What is my dog's name?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Your dog's name is Buddy."));
}

#[test]
fn say_requires_text() {
    chord_cmd().arg("say").assert().failure();
}

#[test]
fn seeded_runs_repeat() {
    let run = || {
        chord_cmd()
            .args(["say", "Hello", "Tell me about volcanoes", "Thanks!"])
            .output()
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
}

#[test]
fn batch_processes_lines_in_order() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("turns.txt");
    std::fs::write(&input, "Hello\n\nMy name is Alice\nWhat is my name?\n").unwrap();

    let output = chord_cmd().arg("batch").arg(&input).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    // blank input lines are skipped
    assert_eq!(lines.len(), 3, "{stdout}");
    assert!(lines[2].contains("Your name is Alice."), "{stdout}");
}

#[test]
fn batch_missing_file_fails() {
    chord_cmd()
        .args(["batch", "/definitely/not/here.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn chat_reads_stdin_until_quit() {
    chord_cmd()
        .arg("chat")
        .write_stdin("My name is Alice\nWhat is my name?\n/quit\nWhat is my name?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Your name is Alice.").count(1));
}

#[test]
fn chat_reset_forgets() {
    chord_cmd()
        .arg("chat")
        .write_stdin("My name is Alice\n/reset\nWhat is my name?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("(conversation reset)"))
        .stdout(predicate::str::contains("Your name is Alice.").not());
}

#[test]
fn chat_debug_prints_json() {
    chord_cmd()
        .arg("chat")
        .write_stdin("Hello\n/debug\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("\"memory\""))
        .stderr(predicate::str::contains("\"phase\": \"opening\""));
}

#[test]
fn debug_flag_reports_every_turn() {
    chord_cmd()
        .args(["--debug", "say", "Hello", "Hi again"])
        .assert()
        .success()
        .stderr(predicate::str::contains("\"turns\": 2"))
        .stderr(predicate::str::contains("\"turns\": 4"));
}

#[test]
fn config_file_sets_bot_name() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("chord.toml");
    std::fs::write(&config, "bot_name = \"Echo\"\n").unwrap();

    chord_cmd()
        .env("CHORD_CONFIG", &config)
        .args(["say", "What's your name?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("My name is Echo."));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("chord.toml");
    std::fs::write(&config, "[memory]\nhistory_cap = 0\n").unwrap();

    chord_cmd()
        .arg("--config")
        .arg(&config)
        .args(["say", "Hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn unreachable_http_backend_fails_fast() {
    chord_cmd()
        .args(["--backend", "http", "--backend-url", "http://127.0.0.1:9"])
        .args(["say", "Hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to initialize engine"));
}
