//! Where ondict keeps its data.
//!
//! Everything lives under one data directory: `$ONDICT_HOME` when set,
//! otherwise `~/.config/ondict`. Decoded dictionaries are in `dicts/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "ONDICT_HOME";

const DEFAULT_DICT: &str = "dict.json";
const DEFAULT_STYLESHEET: &str = "dict.css";

/// Resolved locations of the dictionary and its stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictPaths {
    pub dict: PathBuf,
    pub stylesheet: Option<PathBuf>,
}

impl DictPaths {
    /// Fill in whatever the command line left unspecified from the data
    /// directory. Paths are made absolute so a spawned daemon resolves them
    /// the same way regardless of its working directory.
    pub fn resolve(dict: Option<PathBuf>, stylesheet: Option<PathBuf>) -> Result<Self> {
        let dicts_dir = || -> Result<PathBuf> { Ok(data_dir()?.join("dicts")) };

        let dict = match dict {
            Some(path) => absolute(&path)?,
            None => dicts_dir()?.join(DEFAULT_DICT),
        };
        let stylesheet = match stylesheet {
            Some(path) => Some(absolute(&path)?),
            None => {
                let default = dict.with_file_name(DEFAULT_STYLESHEET);
                default.exists().then_some(default)
            }
        };
        Ok(Self { dict, stylesheet })
    }
}

/// The data directory, without creating it.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(".config").join("ondict"))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path {}", path.display()))
}
