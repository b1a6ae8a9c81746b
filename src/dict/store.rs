//! Decoded dictionary files.
//!
//! A decoded dictionary is a JSON object mapping each headword to its raw
//! entry markup, as produced by the offline MDX decoder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::utils::error::DictError;

/// Read a decoded dictionary file into a headword -> markup map.
pub fn load_entries(path: &Path) -> Result<HashMap<String, String>, DictError> {
    let data = std::fs::read(path)
        .map_err(|source| DictError::Read { path: path.to_path_buf(), source })?;
    let entries: HashMap<String, String> = serde_json::from_slice(&data)
        .map_err(|source| DictError::Decode { path: path.to_path_buf(), source })?;
    tracing::debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Read the stylesheet shipped alongside a dictionary.
///
/// A missing or unreadable stylesheet only degrades `html` output, so it is
/// logged and treated as empty.
pub fn load_stylesheet(path: Option<&PathBuf>) -> String {
    let Some(path) = path else {
        return String::new();
    };
    match std::fs::read_to_string(path) {
        Ok(css) => css,
        Err(e) => {
            tracing::warn!("Failed to load stylesheet {}: {e}", path.display());
            String::new()
        }
    }
}
