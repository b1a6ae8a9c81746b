//! Daemon mode: a long-lived background process holding the loaded
//! dictionary and its match index.
//!
//! Building the index is the expensive part of a lookup. The daemon pays
//! that cost once and answers every following `ondict lookup` over a local
//! socket, shutting itself down after a period without requests.

use std::fmt;

pub mod address;
pub mod client;
pub mod idle;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod transport;

pub use address::{Address, AddressSpec, Transport};
pub use client::{connect_or_spawn, DaemonClient, RetryPolicy, SelfSpawner, Spawner};
pub use server::DaemonServer;

/// States of the daemon lifecycle, on either side of the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Direct mode: the dictionary is loaded in-process, no daemon involved.
    Standalone,
    /// Client: trying to reach an already running daemon.
    Probing,
    /// Client: connected; one request is sent and the client is done.
    Connected,
    /// Client: no daemon answered, a new one is being started.
    Spawning,
    /// Server: dictionary loaded, index built, address bound.
    Listening,
    /// Server: a full idle timeout passed without a request.
    IdleShutdown,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standalone => "standalone",
            Self::Probing => "probing",
            Self::Connected => "connected",
            Self::Spawning => "spawning",
            Self::Listening => "listening",
            Self::IdleShutdown => "idle-shutdown",
        };
        f.write_str(name)
    }
}
