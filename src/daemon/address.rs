//! Resolving where the daemon listens.
//!
//! A client and the daemon it spawns must agree on an address without
//! talking to each other first. The canonical address is derived from the
//! absolute path of the running executable, so the same build always finds
//! its own daemon while two installs (or a dev build next to a release
//! build) never share one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::utils::error::AddressError;

/// Transport a daemon address uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Unix domain socket; the location is a filesystem path.
    Unix,
    /// TCP; the location is `host:port`.
    Tcp,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::Tcp => "tcp",
        }
    }
}

/// A concrete daemon address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub transport: Transport,
    pub location: String,
}

impl Address {
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self { transport: Transport::Unix, location: path.into().to_string_lossy().into_owned() }
    }

    pub fn tcp(location: impl Into<String>) -> Self {
        Self { transport: Transport::Tcp, location: location.into() }
    }

    /// Filesystem path of a socket-file address.
    pub fn socket_path(&self) -> Option<&Path> {
        match self.transport {
            Transport::Unix => Some(Path::new(&self.location)),
            Transport::Tcp => None,
        }
    }
}

/// Formats as an explicit specifier (`kind;location`) that parses back to
/// the same address. The spawned daemon receives its address this way.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.transport.as_str(), self.location)
    }
}

/// A user-supplied address specifier.
///
/// Grammar: `auto` | `<kind>;<location>` | `<location>`. A bare location is
/// TCP. `auto` asks for the canonical address of the running executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSpec {
    Auto,
    Explicit(Address),
}

impl FromStr for AddressSpec {
    type Err = AddressError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        if spec == "auto" {
            return Ok(Self::Auto);
        }
        let (transport, location) = match spec.split_once(';') {
            Some((kind, location)) => {
                let transport = match kind {
                    "unix" => Transport::Unix,
                    "tcp" => Transport::Tcp,
                    other => {
                        return Err(AddressError::UnknownTransport {
                            spec: spec.to_string(),
                            kind: other.to_string(),
                        })
                    }
                };
                (transport, location)
            }
            None => (Transport::Tcp, spec),
        };
        if location.is_empty() {
            return Err(AddressError::EmptyLocation { spec: spec.to_string() });
        }
        Ok(Self::Explicit(Address { transport, location: location.to_string() }))
    }
}

impl AddressSpec {
    /// Turn the specifier into a concrete address, deriving the canonical
    /// one from the running executable for `auto`.
    pub fn resolve(&self) -> Result<Address> {
        match self {
            Self::Explicit(address) => Ok(address.clone()),
            Self::Auto => Ok(derive_canonical(&current_exe()?)),
        }
    }
}

/// Absolute path of the running executable.
pub fn current_exe() -> Result<PathBuf> {
    std::env::current_exe().context("Failed to get current executable path")
}

/// Short, stable fingerprint of an executable path.
fn fingerprint(executable: &Path) -> [u8; 32] {
    let digest = Sha256::digest(executable.to_string_lossy().as_bytes());
    digest.into()
}

fn short_hash(executable: &Path) -> String {
    hex::encode(&fingerprint(executable)[..4])
}

/// The canonical daemon address for an executable.
///
/// On Unix this is a socket file in the temp directory named after the
/// executable hash and the current user; elsewhere it is a loopback TCP port
/// picked from the hash.
pub fn derive_canonical(executable: &Path) -> Address {
    #[cfg(unix)]
    {
        // SAFETY: getuid has no preconditions and cannot fail.
        #[allow(unsafe_code)]
        let uid = unsafe { libc::getuid() };
        let name = format!("ondict-{}-daemon.{uid}", short_hash(executable));
        Address::unix(std::env::temp_dir().join(name))
    }

    #[cfg(not(unix))]
    {
        let hash = fingerprint(executable);
        let seed = u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]]);
        let port = 1024 + seed % (u32::from(u16::MAX) - 1024);
        Address::tcp(format!("127.0.0.1:{port}"))
    }
}

/// Log file a spawned daemon writes its diagnostics to.
pub fn daemon_log_path(executable: &Path) -> PathBuf {
    std::env::temp_dir().join(format!("ondict-{}-daemon.log", short_hash(executable)))
}
