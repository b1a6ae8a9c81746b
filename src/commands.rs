use anyhow::{bail, Context, Result};
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::cli::args::{DaemonCommands, LookupArgs};
use crate::cli::output::{ColorChoice, OutputFormatter, Stream};
use crate::config::DictPaths;
use crate::daemon::address::{current_exe, daemon_log_path};
use crate::daemon::client::DIAL_TIMEOUT;
use crate::daemon::protocol::DictQuery;
use crate::daemon::{
    connect_or_spawn, Address, AddressSpec, DaemonClient, DaemonServer, LifecycleState,
    RetryPolicy, SelfSpawner,
};
use crate::dict::{Dictionary, Engine, Entry, Format};

/// How to look words up and how to reach the dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOptions {
    pub engine: Engine,
    pub format: Format,
    pub remote: AddressSpec,
    pub direct: bool,
    pub dial_timeout: Duration,
    /// Handed to a daemon this command spawns.
    pub idle_timeout: Duration,
}

impl From<LookupArgs> for LookupOptions {
    fn from(args: LookupArgs) -> Self {
        Self {
            engine: args.engine,
            format: args.format,
            remote: args.remote,
            direct: args.direct,
            dial_timeout: seconds(args.dial_timeout),
            idle_timeout: seconds(args.idle_timeout),
        }
    }
}

/// Seconds already checked to be finite and non-negative; too large
/// saturates.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// Where lookups are answered.
enum Backend {
    /// Dictionary loaded in-process.
    Direct(Dictionary),
    /// The daemon at `address`, started on demand.
    Daemon { address: Address, spawner: SelfSpawner, policy: RetryPolicy },
}

impl Backend {
    fn new(options: &LookupOptions, paths: &DictPaths, verbose: bool) -> Result<Self> {
        if options.direct {
            tracing::debug!("Daemon state: {}", LifecycleState::Standalone);
            let dictionary = Dictionary::open(&paths.dict, paths.stylesheet.as_ref())?;
            return Ok(Self::Direct(dictionary));
        }

        let address = options.remote.resolve()?;
        let executable = current_exe()?;
        let spawner = SelfSpawner {
            log_file: daemon_log_path(&executable),
            executable,
            paths: paths.clone(),
            idle_timeout: options.idle_timeout,
            verbose,
        };
        let policy = RetryPolicy { dial_timeout: options.dial_timeout, ..RetryPolicy::default() };
        Ok(Self::Daemon { address, spawner, policy })
    }

    /// Look one word up. Each daemon lookup is its own connection, so a
    /// daemon that idled out between two words is started again.
    async fn lookup(&self, word: &str, options: &LookupOptions) -> Result<Option<Entry>> {
        match self {
            Self::Direct(dictionary) => Ok(dictionary.lookup(word, options.format)),
            Self::Daemon { address, spawner, policy } => {
                let client = connect_or_spawn(address, *policy, spawner).await?;
                client.lookup(&DictQuery::new(word, options.engine, options.format)).await
            }
        }
    }
}

/// Body to stdout; a note to stderr when a suggestion is shown instead.
fn print_entry(out: &mut impl Write, word: &str, entry: &Entry, notes: &OutputFormatter) -> Result<()> {
    if let Some(note) = notes.suggestion_note(word, entry) {
        eprintln!("{note}");
    }
    writeln!(out, "{}", entry.body)?;
    Ok(())
}

pub async fn handle_lookup_command(
    word: &str,
    options: &LookupOptions,
    paths: &DictPaths,
    verbose: bool,
    color: ColorChoice,
) -> Result<()> {
    let backend = Backend::new(options, paths, verbose)?;
    let Some(entry) = backend.lookup(word, options).await? else {
        bail!("No entry found for {word:?}");
    };
    let notes = OutputFormatter::new(color, Stream::Stderr);
    print_entry(&mut std::io::stdout().lock(), word, &entry, &notes)
}

pub async fn handle_interactive_command(
    options: &LookupOptions,
    paths: &DictPaths,
    verbose: bool,
    color: ColorChoice,
) -> Result<()> {
    let backend = Backend::new(options, paths, verbose)?;
    let notes = OutputFormatter::new(color, Stream::Stderr);
    let prompt = std::io::stdin().is_terminal();
    if prompt {
        eprintln!("ondict interactive mode: one word per line, \"quit\" to exit");
    }

    let input = BufReader::new(tokio::io::stdin());
    interact(&backend, options, input, &mut std::io::stdout(), &notes, prompt).await
}

/// The read-lookup-print loop. Missing entries are reported and skipped;
/// errors reaching the dictionary end the loop.
async fn interact<R, W>(
    backend: &Backend,
    options: &LookupOptions,
    input: R,
    out: &mut W,
    notes: &OutputFormatter,
    prompt: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            eprint!("> ");
        }
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let word = line.trim();
        match word {
            "" => continue,
            "quit" | "q" => break,
            _ => {}
        }

        match backend.lookup(word, options).await? {
            Some(entry) => print_entry(out, word, &entry, notes)?,
            None => eprintln!("No entry found for {word:?}"),
        }
        out.flush()?;
    }
    Ok(())
}

/// Run a daemon in the foreground until it idles out.
pub async fn handle_serve_command(
    listen: &AddressSpec,
    idle_timeout: f64,
    paths: &DictPaths,
) -> Result<()> {
    let address = listen.resolve()?;
    let dictionary = Dictionary::open(&paths.dict, paths.stylesheet.as_ref())?;
    tracing::info!("Loaded {} headwords from {}", dictionary.len(), paths.dict.display());

    let server = DaemonServer::bind(&address, Arc::new(dictionary), idle_duration(idle_timeout))
        .await
        .context("Failed to start daemon")?;
    server.run().await
}

/// `0`, or a timeout too large to represent, disables idle shutdown.
fn idle_duration(seconds: f64) -> Option<Duration> {
    if seconds <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

pub async fn handle_daemon_command(command: DaemonCommands, color: ColorChoice) -> Result<()> {
    match command {
        DaemonCommands::Status { remote } => {
            let address = remote.resolve()?;
            let formatter = OutputFormatter::new(color, Stream::Stdout);
            match DaemonClient::connect(&address, DIAL_TIMEOUT).await {
                Ok(client) => {
                    let status = client.status().await?;
                    println!("{}", formatter.format_status(&address, &status));
                }
                Err(err) => {
                    tracing::debug!("{err:#}");
                    println!("{}", formatter.format_not_running(&address));
                }
            }
        }
    }

    Ok(())
}
