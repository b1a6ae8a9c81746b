use clap::ValueEnum;
use owo_colors::OwoColorize;
pub use supports_color::Stream;

use crate::daemon::protocol::StatusResult;
use crate::daemon::Address;
use crate::dict::{Entry, MatchKind};

/// When to color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Color when writing to a terminal that supports it
    #[default]
    Auto,
    Always,
    Never,
}

/// Formats command results for the terminal.
///
/// Entry bodies are printed as rendered; only the notes around them
/// (suggestions, daemon status) are colored, and only on a color terminal.
pub struct OutputFormatter {
    color: bool,
}

impl OutputFormatter {
    /// Formatter for output written to `stream`.
    pub fn new(choice: ColorChoice, stream: Stream) -> Self {
        let color = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => supports_color::on(stream).is_some_and(|level| level.has_basic),
        };
        Self { color }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Note printed to stderr when the entry shown is not the word asked for.
    pub fn suggestion_note(&self, word: &str, entry: &Entry) -> Option<String> {
        if entry.kind != MatchKind::Suggestion {
            return None;
        }
        let headword = if self.color {
            entry.headword.yellow().bold().to_string()
        } else {
            entry.headword.clone()
        };
        Some(format!("No entry for {word:?}; showing {headword}"))
    }

    pub fn format_status(&self, address: &Address, status: &StatusResult) -> String {
        let state = if self.color { "running".green().bold().to_string() } else { "running".to_string() };
        let idle = match status.idle_timeout {
            Some(seconds) => format!("{seconds}s"),
            None => "disabled".to_string(),
        };
        format!(
            "Daemon: {state}\nAddress: {address}\nUptime: {}s\nHeadwords: {}\nIdle timeout: {idle}",
            status.uptime, status.headwords
        )
    }

    pub fn format_not_running(&self, address: &Address) -> String {
        let state =
            if self.color { "not running".red().bold().to_string() } else { "not running".to_string() };
        format!("Daemon: {state}\nAddress: {address}")
    }
}
