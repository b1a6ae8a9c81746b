use clap::builder::styling::{AnsiColor, Styles};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::output::ColorChoice;
use crate::daemon::client::{DEFAULT_IDLE_TIMEOUT, DIAL_TIMEOUT};
use crate::daemon::AddressSpec;
use crate::dict::{Engine, Format};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::Cyan.on_default().bold())
    .placeholder(AnsiColor::Cyan.on_default())
    .error(AnsiColor::Red.on_default().bold());

const AFTER_HELP: &str = "\x1b[1;32mQuick Reference:\x1b[0m
  \x1b[1;36mLook up a word\x1b[0m (a background daemon starts on first use):
    ondict lookup doctor                 Entry rendered as markdown
    ondict lookup doctor --format html   Raw entry markup with its stylesheet
    ondict lookup doctors                No exact entry: closest headword inside the word

  \x1b[1;36mSeveral words:\x1b[0m
    ondict interactive                   One word per line on stdin, \"quit\" to stop

  \x1b[1;36mWithout a daemon:\x1b[0m
    ondict lookup doctor --direct        Load the dictionary in-process for one lookup

  \x1b[1;36mDaemon:\x1b[0m
    ondict daemon status                 Is a daemon running for this ondict?
    ondict serve --listen 127.0.0.1:8001 Run a daemon in the foreground";

#[derive(Parser)]
#[command(name = "ondict")]
#[command(about = "Look words up in a local dictionary, served by a background daemon")]
#[command(version)]
#[command(styles = STYLES)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Decoded dictionary (JSON object of headword to entry markup)
    /// [default: $ONDICT_HOME/dicts/dict.json]
    #[arg(long, value_name = "FILE", global = true)]
    pub dict: Option<PathBuf>,

    /// Stylesheet appended to html output [default: dict.css next to the dictionary]
    #[arg(long, value_name = "FILE", global = true)]
    pub css: Option<PathBuf>,

    /// When to color suggestion notes and daemon status
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorChoice::Auto, global = true)]
    pub color: ColorChoice,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up a word
    #[command(
        long_about = "Look up a word. Exact headwords win, then the lowercase form; otherwise \
        the longest headword found inside the word is shown as a suggestion.\n\n\
        By default the lookup goes through a background daemon that keeps the dictionary \
        loaded; one is started if none is running.\n\n\
        Examples:\n  \
        ondict lookup doctor\n  \
        ondict lookup doctor --format text\n  \
        ondict lookup doctor --remote unix;/tmp/ondict.sock\n  \
        ondict lookup doctor --direct"
    )]
    Lookup {
        word: String,

        #[command(flatten)]
        options: LookupArgs,
    },

    /// Look up words read from standard input, one per line
    #[command(
        long_about = "Read words from standard input and look each one up as `lookup` would. \
        A missing entry is reported and the loop goes on; an empty line is skipped and \
        `quit` (or end of input) stops.\n\n\
        Examples:\n  \
        ondict interactive\n  \
        printf 'doctor\\napple\\n' | ondict interactive --format text"
    )]
    Interactive {
        #[command(flatten)]
        options: LookupArgs,
    },

    /// Run a daemon in the foreground (this is what `lookup` spawns)
    #[command(
        long_about = "Load the dictionary, build its index, and answer lookups on the given \
        address until no request arrives for the idle timeout.\n\n\
        Examples:\n  \
        ondict serve --listen 127.0.0.1:8001\n  \
        ondict serve --listen unix;/tmp/ondict.sock --idle-timeout 0   # never idle out"
    )]
    Serve {
        /// Address to listen on: auto, <unix|tcp>;<location>, or a bare host:port
        #[arg(short, long, value_name = "SPEC")]
        listen: AddressSpec,

        /// Seconds without a request before the daemon exits (0 disables)
        #[arg(
            long,
            value_name = "SECONDS",
            default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs_f64(),
            value_parser = parse_seconds
        )]
        idle_timeout: f64,
    },

    /// Inspect the background daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },
}

/// How a word is looked up; shared by `lookup` and `interactive`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct LookupArgs {
    /// Dictionary engine
    #[arg(short, long, value_enum, default_value_t = Engine::Mdx)]
    pub engine: Engine,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Md)]
    pub format: Format,

    /// Daemon address: auto, <unix|tcp>;<location>, or a bare host:port
    #[arg(long, value_name = "SPEC", default_value = "auto", conflicts_with = "direct")]
    pub remote: AddressSpec,

    /// Skip the daemon and load the dictionary in-process
    #[arg(long)]
    pub direct: bool,

    /// Seconds to wait for each connection attempt to the daemon
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DIAL_TIMEOUT.as_secs_f64(),
        value_parser = parse_seconds
    )]
    pub dial_timeout: f64,

    /// Idle timeout handed to a daemon this command starts (0 disables)
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs_f64(),
        value_parser = parse_seconds
    )]
    pub idle_timeout: f64,
}

#[derive(Subcommand)]
pub enum DaemonCommands {
    /// Show whether a daemon is reachable (never starts one)
    Status {
        /// Daemon address: auto, <unix|tcp>;<location>, or a bare host:port
        #[arg(long, value_name = "SPEC", default_value = "auto")]
        remote: AddressSpec,
    },
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|_| format!("{value:?} is not a number"))?;
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(format!("{value:?} is not a non-negative number of seconds"))
    }
}
