use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("chatline")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("reset"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_send_help_shows_flags() {
    cargo_bin_cmd!("chatline")
        .args(["send", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--raw"))
        .stdout(predicate::str::contains("--user"))
        .stdout(predicate::str::contains("--progress"));
}

#[test]
fn test_send_requires_message() {
    cargo_bin_cmd!("chatline").arg("send").assert().failure();
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("chatline")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
