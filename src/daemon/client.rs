//! Daemon client: find a running daemon, or start one and wait for it.
//!
//! A client makes one request per connection. It first dials the resolved
//! address; if nothing answers it removes a stale socket file, re-invokes
//! its own executable in server mode and dials again within a fixed attempt
//! budget. Readiness is only ever discovered by dialing.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper::header::HOST;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::time::timeout;

use super::address::Address;
use super::protocol::{DictQuery, StatusResult, MATCH_HEADER};
use super::transport::{self, BoxedStream};
use super::LifecycleState;
use crate::config::DictPaths;
use crate::dict::{Entry, MatchKind};
use crate::utils::error::LifecycleError;

/// Bound on a single connection attempt.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection attempts made after spawning a daemon.
pub const MAX_CONNECT_ATTEMPTS: usize = 5;

/// Idle timeout handed to daemons this client spawns.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on sending a request and reading its response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A daemon log past this size is moved to `<log>.old` before the next
/// spawn appends to it.
const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// How hard to try reaching a freshly spawned daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub dial_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: MAX_CONNECT_ATTEMPTS, dial_timeout: DIAL_TIMEOUT }
    }
}

/// Starts a daemon listening on a given address without waiting for it.
pub trait Spawner {
    fn spawn(&self, address: &Address) -> Result<(), LifecycleError>;
}

/// Spawns the running executable in server mode.
///
/// The child gets `--dict`/`--css` as absolute paths and the address in its
/// explicit `kind;location` form, so it needs nothing from the parent's
/// environment or working directory. Its stderr goes to `log_file`.
#[derive(Debug, Clone)]
pub struct SelfSpawner {
    pub executable: PathBuf,
    pub paths: DictPaths,
    pub idle_timeout: Duration,
    pub verbose: bool,
    pub log_file: PathBuf,
}

impl SelfSpawner {
    fn command(&self, address: &Address) -> Command {
        let mut command = Command::new(&self.executable);
        if self.verbose {
            command.arg("--verbose");
        }
        command.arg("--dict").arg(&self.paths.dict);
        if let Some(css) = &self.paths.stylesheet {
            command.arg("--css").arg(css);
        }
        command
            .arg("serve")
            .arg("--listen")
            .arg(address.to_string())
            .arg("--idle-timeout")
            .arg(self.idle_timeout.as_secs_f64().to_string());
        command
    }

    fn log_stdio(&self) -> Stdio {
        rotate_log(&self.log_file);
        match OpenOptions::new().create(true).append(true).open(&self.log_file) {
            Ok(file) => Stdio::from(file),
            Err(err) => {
                tracing::warn!("Failed to open daemon log {}: {err}", self.log_file.display());
                Stdio::null()
            }
        }
    }
}

fn rotate_log(path: &Path) {
    if !std::fs::metadata(path).is_ok_and(|meta| meta.len() > MAX_LOG_BYTES) {
        return;
    }
    let old = path.with_extension("log.old");
    match std::fs::rename(path, &old) {
        Ok(()) => tracing::debug!("Rotated daemon log to {}", old.display()),
        Err(err) => tracing::warn!("Failed to rotate daemon log {}: {err}", path.display()),
    }
}

impl Spawner for SelfSpawner {
    fn spawn(&self, address: &Address) -> Result<(), LifecycleError> {
        if !self.paths.dict.is_file() {
            return Err(LifecycleError::MissingDictionary { path: self.paths.dict.clone() });
        }

        let mut command = self.command(address);
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(self.log_stdio());

        // Own process group, so a Ctrl-C in the terminal that ran the first
        // lookup does not take the daemon down with it.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(LifecycleError::Spawn)?;
        tracing::debug!(
            "Spawned daemon process with PID {} (log: {})",
            child.id(),
            self.log_file.display()
        );
        Ok(())
    }
}

/// A connection to a running daemon. Each request consumes the client.
pub struct DaemonClient {
    stream: BoxedStream,
    address: Address,
}

impl DaemonClient {
    /// Connect to a daemon that is already running.
    pub async fn connect(address: &Address, dial_timeout: Duration) -> Result<Self> {
        let stream = timeout(dial_timeout, transport::connect(address))
            .await
            .with_context(|| format!("Timed out connecting to daemon at {address}"))?
            .with_context(|| format!("Failed to connect to daemon at {address}"))?;

        tracing::debug!("Connected to daemon at {address}");
        Ok(Self { stream, address: address.clone() })
    }

    /// Send one `GET` and read the whole response.
    async fn send(self, target: &str) -> Result<Response<String>> {
        let Self { stream, address } = self;
        timeout(REQUEST_TIMEOUT, async move {
            let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
                .await
                .context("Failed to start HTTP exchange with daemon")?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    tracing::debug!("Daemon connection error: {err}");
                }
            });

            let request = Request::get(target)
                .header(HOST, "ondict")
                .body(Empty::<Bytes>::new())
                .context("Failed to build request")?;
            tracing::debug!("Sending request to {address}: GET {target}");
            let response =
                sender.send_request(request).await.context("Failed to send request to daemon")?;

            let (parts, body) = response.into_parts();
            let body = body.collect().await.context("Failed to read response body")?.to_bytes();
            let body = String::from_utf8(body.to_vec()).context("Response body is not UTF-8")?;
            tracing::debug!("Received response: status={}", parts.status);
            Ok(Response::from_parts(parts, body))
        })
        .await
        .context("Request timed out")?
    }

    /// Look a word up. `None` when the daemon has no entry for it.
    pub async fn lookup(self, query: &DictQuery) -> Result<Option<Entry>> {
        let response = self.send(&query.target()).await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                bail!("Daemon error ({status}): {}", response.body().trim());
            }
            _ => {}
        }

        let suggestion = response
            .headers()
            .get(MATCH_HEADER)
            .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
            .and_then(|value| value.strip_prefix("suggestion;"))
            .map(str::to_string);
        let body = response.into_body();
        let entry = match suggestion {
            Some(headword) => Entry { headword, kind: MatchKind::Suggestion, body },
            None => Entry { headword: query.word.clone(), kind: MatchKind::Exact, body },
        };
        Ok(Some(entry))
    }

    pub async fn status(self) -> Result<StatusResult> {
        let response = self.send("/status").await?;
        if !response.status().is_success() {
            bail!("Daemon error ({}): {}", response.status(), response.body().trim());
        }
        serde_json::from_str(response.body()).context("Failed to parse daemon status")
    }
}

/// Reach the daemon at `address`, starting one with `spawner` if none
/// answers.
///
/// A spawn the OS refused is not fatal by itself: another client may have
/// started the daemon concurrently, so the retry loop still runs. A spawner
/// that has nothing to serve fails the call at once. Each attempt takes
/// at least `policy.dial_timeout` (fast failures sleep off the rest) and the
/// last failed attempt returns [`LifecycleError::RetriesExhausted`].
pub async fn connect_or_spawn(
    address: &Address,
    policy: RetryPolicy,
    spawner: &dyn Spawner,
) -> Result<DaemonClient, LifecycleError> {
    tracing::debug!("Daemon state: {} ({address})", LifecycleState::Probing);
    match DaemonClient::connect(address, policy.dial_timeout).await {
        Ok(client) => {
            tracing::debug!("Daemon state: {}", LifecycleState::Connected);
            return Ok(client);
        }
        Err(err) => tracing::debug!("First dial failed: {err:#}"),
    }

    remove_stale_socket(address)?;

    tracing::info!("Daemon state: {} ({address})", LifecycleState::Spawning);
    match spawner.spawn(address) {
        Ok(()) => {}
        Err(err @ LifecycleError::Spawn(_)) => tracing::warn!("{err}"),
        Err(err) => return Err(err),
    }

    for attempt in 1..=policy.attempts {
        let started = Instant::now();
        match DaemonClient::connect(address, policy.dial_timeout).await {
            Ok(client) => {
                tracing::info!("Daemon state: {} after {attempt} attempt(s)", LifecycleState::Connected);
                return Ok(client);
            }
            Err(err) => {
                tracing::debug!("Connection attempt {attempt}/{} failed: {err:#}", policy.attempts);
            }
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.dial_timeout.saturating_sub(started.elapsed())).await;
        }
    }

    Err(LifecycleError::RetriesExhausted { address: address.to_string(), attempts: policy.attempts })
}

/// Remove a socket file nobody is listening on.
///
/// Only called after a failed connect. Between that check and the removal
/// another daemon may have bound the same path; with one user per socket
/// this is accepted.
fn remove_stale_socket(address: &Address) -> Result<(), LifecycleError> {
    let Some(path) = address.socket_path() else {
        return Ok(());
    };
    if std::fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    tracing::warn!("Removing stale socket file {}", path.display());
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LifecycleError::StaleSocket { path: path.to_path_buf(), source }),
    }
}
