#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub const DICT_JSON: &str = r#"{
    "jesus": "<b>Jesus</b> <i>noun</i>",
    "doctor": "<div><b>doctor</b></div><div>a person who treats the sick</div>",
    "doc": "<b>doc</b> short for doctor",
    "apple": "a fruit &amp; a tree"
}"#;

pub const DICT_CSS: &str = ".hw{color:red}";

/// A data directory laid out the way ondict expects, with a small
/// dictionary and stylesheet under `dicts/`.
pub struct DataDir {
    pub dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let dicts = dir.path().join("dicts");
        std::fs::create_dir_all(&dicts).unwrap();
        std::fs::write(dicts.join("dict.json"), DICT_JSON).unwrap();
        std::fs::write(dicts.join("dict.css"), DICT_CSS).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Socket path inside the data directory, for explicit `unix;` addresses.
    pub fn socket(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// `ondict` with `ONDICT_HOME` pointing at this directory.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("ondict");
        cmd.env("ONDICT_HOME", self.dir.path());
        cmd
    }

    /// Same as [`DataDir::cmd`], as a plain `std::process::Command` for
    /// processes the test needs to watch while they run.
    pub fn std_cmd(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin!("ondict"));
        cmd.env("ONDICT_HOME", self.dir.path());
        cmd
    }
}

/// Poll until `path` exists. Returns false on timeout.
pub fn wait_for_path(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

/// Poll until `path` is gone. Returns false on timeout.
pub fn wait_for_removal(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}
