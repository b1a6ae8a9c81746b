//! End-to-end daemon tests over Unix sockets inside a temp directory, so
//! they never touch the canonical daemon of an installed ondict.
#![cfg(unix)]

#[path = "common.rs"]
mod common;

use common::{wait_for_path, wait_for_removal, DataDir};
use predicates::prelude::*;
use std::path::Path;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

/// Kills the wrapped daemon if a test bails out before it exits on its own.
struct ServeGuard(Child);

impl Drop for ServeGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

impl ServeGuard {
    fn is_running(&mut self) -> bool {
        self.0.try_wait().expect("failed to poll daemon").is_none()
    }

    /// Wait for the daemon to exit on its own; returns its exit success.
    fn wait_exit(&mut self, timeout: Duration) -> Option<bool> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(status) = self.0.try_wait().expect("failed to poll daemon") {
                return Some(status.success());
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        None
    }
}

fn serve(data: &DataDir, socket: &Path, idle_timeout: &str) -> ServeGuard {
    let child = data
        .std_cmd()
        .arg("serve")
        .arg("--listen")
        .arg(format!("unix;{}", socket.display()))
        .arg("--idle-timeout")
        .arg(idle_timeout)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn ondict serve");
    let mut guard = ServeGuard(child);
    assert!(wait_for_path(socket, Duration::from_secs(10)), "daemon never bound its socket");
    assert!(guard.is_running());
    guard
}

fn sleep_until(instant: Instant) {
    if let Some(remaining) = instant.checked_duration_since(Instant::now()) {
        std::thread::sleep(remaining);
    }
}

/// Idle timeout handed to daemons the tests spawn through `lookup`, so they
/// exit on their own before the temp directory goes away.
const SPAWNED_IDLE: &str = "2";

#[test]
fn test_lookup_spawns_daemon_and_reuses_it() {
    let data = DataDir::new();
    let socket = data.socket("auto.sock");
    let remote = format!("unix;{}", socket.display());

    data.cmd()
        .args(["lookup", "jesus", "--dial-timeout", "1", "--idle-timeout", SPAWNED_IDLE])
        .args(["--remote", &remote])
        .assert()
        .success()
        .stdout("**Jesus** *noun*\n");
    assert!(socket.exists(), "spawned daemon should keep its socket");

    // Second lookup goes to the daemon that is now running.
    data.cmd()
        .args(["lookup", "ajesusx", "--format", "html", "--remote", &remote])
        .assert()
        .success()
        .stdout("<b>Jesus</b> <i>noun</i><style>.hw{color:red}</style>\n")
        .stderr(predicate::str::contains("showing jesus"));

    data.cmd()
        .args(["lookup", "zebra", "--remote", &remote])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No entry found"));

    data.cmd()
        .args(["daemon", "status", "--remote", &remote])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon: running"))
        .stdout(predicate::str::contains("Headwords: 4"))
        .stdout(predicate::str::contains("Idle timeout: 2s"));

    assert!(
        wait_for_removal(&socket, Duration::from_secs(10)),
        "spawned daemon did not idle out"
    );
}

#[test]
fn test_lookup_replaces_stale_socket_file() {
    let data = DataDir::new();
    let socket = data.socket("stale.sock");
    std::fs::write(&socket, "").unwrap();

    data.cmd()
        .args(["lookup", "apple", "--format", "text", "--dial-timeout", "1"])
        .args(["--idle-timeout", SPAWNED_IDLE, "--remote"])
        .arg(format!("unix;{}", socket.display()))
        .assert()
        .success()
        .stdout("a fruit & a tree\n");

    assert!(
        wait_for_removal(&socket, Duration::from_secs(10)),
        "spawned daemon did not idle out"
    );
}

#[test]
fn test_interactive_goes_through_daemon() {
    let data = DataDir::new();
    let socket = data.socket("interactive.sock");

    data.cmd()
        .args(["interactive", "--format", "text", "--dial-timeout", "1"])
        .args(["--idle-timeout", SPAWNED_IDLE, "--remote"])
        .arg(format!("unix;{}", socket.display()))
        .write_stdin("jesus\nzebra\nDoctors\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Jesus noun\n"))
        .stdout(predicate::str::contains("a person who treats the sick"))
        .stderr(predicate::str::contains("No entry found for \"zebra\""))
        .stderr(predicate::str::contains("showing doctor"));

    assert!(socket.exists(), "daemon should outlive the interactive session");
    assert!(
        wait_for_removal(&socket, Duration::from_secs(10)),
        "spawned daemon did not idle out"
    );
}

#[test]
fn test_second_serve_does_not_steal_live_socket() {
    let data = DataDir::new();
    let socket = data.socket("taken.sock");
    let mut first = serve(&data, &socket, "0");

    data.cmd()
        .args(["serve", "--listen"])
        .arg(format!("unix;{}", socket.display()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already listening"));

    assert!(first.is_running());
    data.cmd()
        .args(["daemon", "status", "--remote"])
        .arg(format!("unix;{}", socket.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon: running"));
}

#[test]
fn test_serve_shuts_down_when_idle() {
    let data = DataDir::new();
    let socket = data.socket("idle.sock");

    let mut daemon = serve(&data, &socket, "1");
    let ready = Instant::now();

    sleep_until(ready + Duration::from_millis(700));
    assert!(daemon.is_running(), "daemon exited before its idle timeout");

    let exited = daemon.wait_exit(Duration::from_secs(4));
    assert_eq!(exited, Some(true), "daemon did not shut down cleanly after its idle timeout");
    assert!(!socket.exists(), "socket file should be removed on shutdown");
}

#[test]
fn test_request_resets_idle_timer() {
    let data = DataDir::new();
    let socket = data.socket("reset.sock");
    let idle = Duration::from_millis(1500);

    let mut daemon = serve(&data, &socket, "1.5");
    let ready = Instant::now();

    sleep_until(ready + idle / 2);
    data.cmd()
        .args(["daemon", "status", "--remote"])
        .arg(format!("unix;{}", socket.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon: running"));

    sleep_until(ready + idle * 9 / 10);
    assert!(daemon.is_running(), "daemon exited although a request reset its timer");
    // Past the deadline the daemon started with.
    sleep_until(ready + idle * 11 / 10);
    assert!(daemon.is_running(), "daemon exited although a request reset its timer");

    assert_eq!(daemon.wait_exit(Duration::from_secs(5)), Some(true));
}

#[test]
fn test_idle_timeout_zero_never_shuts_down() {
    let data = DataDir::new();
    let socket = data.socket("forever.sock");

    let mut daemon = serve(&data, &socket, "0");
    std::thread::sleep(Duration::from_millis(1500));
    assert!(daemon.is_running());

    data.cmd()
        .args(["daemon", "status", "--remote"])
        .arg(format!("unix;{}", socket.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Idle timeout: disabled"));
}
