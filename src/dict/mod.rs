//! The loaded dictionary: entries, the match index built over their
//! headwords, and the stylesheet used for `html` output.
//!
//! A [`Dictionary`] is built once per process and shared read-only between
//! every request handler, so it holds no interior mutability.

pub mod render;
pub mod store;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;

use crate::index::MatchIndex;
use crate::utils::error::DictError;
pub use render::Format;

/// Dictionary source a lookup is answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Engine {
    /// The locally decoded MDX dictionary
    #[default]
    Mdx,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mdx => "mdx",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mdx" => Ok(Self::Mdx),
            other => Err(format!("unknown engine: {other}")),
        }
    }
}

/// How a query word was matched to a headword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The word (or its lowercase form) is a headword.
    Exact,
    /// No exact headword; the best headword found inside the word is shown.
    Suggestion,
}

/// A resolved lookup, borrowing from the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub headword: &'a str,
    pub markup: &'a str,
    pub kind: MatchKind,
}

/// A rendered lookup, ready to hand to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub headword: String,
    pub kind: MatchKind,
    pub body: String,
}

pub struct Dictionary {
    index: MatchIndex<String>,
    stylesheet: String,
}

impl Dictionary {
    /// Build the dictionary from decoded entries. This is the expensive step
    /// the daemon exists to amortize.
    pub fn new(entries: HashMap<String, String>, stylesheet: String) -> Self {
        let started = std::time::Instant::now();
        let index = MatchIndex::from_entries(entries);
        if index.is_empty() {
            tracing::warn!("Dictionary has no headwords; every lookup will miss");
        }
        tracing::info!("Indexed {} headwords in {:?}", index.len(), started.elapsed());
        Self { index, stylesheet }
    }

    /// Load a decoded dictionary file and its optional stylesheet.
    pub fn open(path: &Path, stylesheet: Option<&PathBuf>) -> Result<Self, DictError> {
        let entries = store::load_entries(path)?;
        Ok(Self::new(entries, store::load_stylesheet(stylesheet)))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Raw markup for an exact headword.
    pub fn exact_lookup(&self, word: &str) -> Option<&str> {
        self.index.exact_lookup(word).map(String::as_str)
    }

    /// Resolve a query word to a headword.
    ///
    /// Tries the word itself, then its lowercase form, then the longest
    /// headword occurring inside either form (earliest end, then
    /// lexicographic, on ties).
    pub fn resolve(&self, word: &str) -> Option<Resolved<'_>> {
        if let Some(found) = self.resolve_exact(word) {
            return Some(found);
        }
        let lower = word.to_lowercase();
        let folded = lower != word;
        if folded {
            if let Some(found) = self.resolve_exact(&lower) {
                return Some(found);
            }
        }

        let mut candidates = self.index.find_all(word);
        if folded {
            candidates.extend(self.index.find_all(&lower));
        }
        let best = candidates.into_iter().min_by(|a, b| {
            b.headword
                .len()
                .cmp(&a.headword.len())
                .then(a.end.cmp(&b.end))
                .then(a.headword.cmp(b.headword))
        })?;
        tracing::debug!(
            "No exact headword for {word:?}, suggesting {:?} at {}..{}",
            best.headword,
            best.start(),
            best.end
        );
        Some(Resolved {
            headword: best.headword,
            markup: self.exact_lookup(best.headword)?,
            kind: MatchKind::Suggestion,
        })
    }

    fn resolve_exact(&self, word: &str) -> Option<Resolved<'_>> {
        let id = self.index.exact(word)?;
        Some(Resolved {
            headword: self.index.headword(id),
            markup: self.index.value(id).as_str(),
            kind: MatchKind::Exact,
        })
    }

    /// Resolve and render a word. `html` output carries the stylesheet.
    pub fn lookup(&self, word: &str, format: Format) -> Option<Entry> {
        let resolved = self.resolve(word)?;
        let mut body = render::render(resolved.markup, format);
        if format == Format::Html {
            body.push_str("<style>");
            body.push_str(&self.stylesheet);
            body.push_str("</style>");
        }
        Some(Entry { headword: resolved.headword.to_string(), kind: resolved.kind, body })
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary").field("index", &self.index).finish_non_exhaustive()
    }
}
