#[path = "common.rs"]
mod common;

use common::DataDir;
use predicates::prelude::*;

#[test]
fn test_direct_lookup_markdown() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "jesus", "--direct"])
        .assert()
        .success()
        .stdout("**Jesus** *noun*\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_direct_lookup_formats() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "apple", "--direct", "--format", "text"])
        .assert()
        .success()
        .stdout("a fruit & a tree\n");

    data.cmd()
        .args(["lookup", "jesus", "--direct", "--format", "html"])
        .assert()
        .success()
        .stdout("<b>Jesus</b> <i>noun</i><style>.hw{color:red}</style>\n");
}

#[test]
fn test_direct_lookup_falls_back_to_lowercase() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "Doctor", "--direct", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a person who treats the sick"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_direct_lookup_suggests_headword_inside_word() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "ajesusx", "--direct"])
        .assert()
        .success()
        .stdout("**Jesus** *noun*\n")
        .stderr(predicate::str::contains("showing jesus"));

    // Longest headword wins over a shorter one ending earlier.
    data.cmd()
        .args(["lookup", "doctors", "--direct", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a person who treats the sick"))
        .stderr(predicate::str::contains("showing doctor"));
}

#[test]
fn test_direct_lookup_suggests_inside_case_variant() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "Doctors", "--direct", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a person who treats the sick"))
        .stderr(predicate::str::contains("showing doctor"));
}

#[test]
fn test_color_flag() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "ajesusx", "--direct", "--color", "always"])
        .assert()
        .success()
        .stderr(predicate::str::contains("\x1b["));

    data.cmd()
        .args(["lookup", "ajesusx", "--direct", "--color", "never"])
        .assert()
        .success()
        .stderr("No entry for \"ajesusx\"; showing jesus\n");
}

#[test]
fn test_interactive_direct() {
    let data = DataDir::new();
    data.cmd()
        .args(["interactive", "--direct", "--format", "text"])
        .write_stdin("apple\n\nzebra\njesus\nquit\ndoctor\n")
        .assert()
        .success()
        .stdout("a fruit & a tree\nJesus noun\n")
        .stderr(predicate::str::contains("No entry found for \"zebra\""));
}

#[test]
fn test_not_found_exits_with_failure() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "zebra", "--direct"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No entry found for \"zebra\""));
}

#[test]
fn test_unreadable_dictionary_is_fatal() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "jesus", "--direct", "--dict"])
        .arg(data.path().join("missing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read dictionary"));

    let broken = data.path().join("broken.json");
    std::fs::write(&broken, "[1, 2").unwrap();
    data.cmd()
        .args(["lookup", "jesus", "--direct", "--dict"])
        .arg(&broken)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to decode dictionary"));
}

#[test]
fn test_missing_dictionary_is_fatal_before_spawning() {
    let data = DataDir::new();
    let socket = data.socket("never.sock");
    data.cmd()
        .args(["lookup", "jesus", "--dict"])
        .arg(data.path().join("missing.json"))
        .arg("--remote")
        .arg(format!("unix;{}", socket.display()))
        .arg("--dial-timeout")
        .arg("0.2")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_bad_address_is_a_usage_error() {
    let data = DataDir::new();
    data.cmd()
        .args(["lookup", "jesus", "--remote", "pipe;/tmp/x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown transport"));

    data.cmd()
        .args(["serve", "--listen", "unix;"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("empty location"));
}

#[test]
fn test_retries_exhausted_exit_code() {
    let data = DataDir::new();
    // TEST-NET-1: nothing answers, and the spawned daemon cannot bind it.
    data.cmd()
        .args(["lookup", "jesus", "--remote", "tcp;192.0.2.1:9", "--dial-timeout", "0.2"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("after 5 attempts"));
}

#[test]
fn test_status_when_not_running() {
    let data = DataDir::new();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    data.cmd()
        .args(["daemon", "status", "--remote", &address])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon: not running"))
        .stdout(predicate::str::contains(format!("tcp;{address}")));
}

#[test]
fn test_help_shows_quick_reference() {
    let data = DataDir::new();
    data.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Quick Reference"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("serve"));
}
