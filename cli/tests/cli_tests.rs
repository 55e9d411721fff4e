use assert_cmd::Command;
use predicates::prelude::*;

fn nosqli() -> Command {
    Command::cargo_bin("nosqli").unwrap()
}

/// Neither -t nor -r given: this is a config error, the only case that
/// exits non-zero.
#[test]
fn test_no_target_or_request_fails() {
    nosqli()
        .assert()
        .failure()
        .stderr(predicate::str::contains("no target URL or raw request file provided"));
}

/// -t and -r are mutually exclusive.
#[test]
fn test_target_and_request_conflict() {
    nosqli()
        .args(["-t", "http://example.com", "-r", "/tmp/does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

/// -r pointing at a missing file is a transport-adjacent failure that
/// happens after a target was accepted, so it still exits 0 -- only the
/// up-front "no target at all" case is a hard failure.
#[test]
fn test_missing_request_file_still_exits_zero() {
    nosqli()
        .args(["-r", "/tmp/nosqli-test-missing-request-file.txt"])
        .assert()
        .success();
}

#[test]
fn test_help_lists_flags() {
    nosqli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--request"))
        .stdout(predicate::str::contains("--sleep-ms"));
}

/// An unreachable target never aborts the process -- transport failures
/// are logged and folded into an empty response, not propagated.
#[test]
fn test_unreachable_target_exits_zero() {
    nosqli()
        .args(["-t", "http://127.0.0.1.invalid.nosqli-test/"])
        .assert()
        .success();
}
