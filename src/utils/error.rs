use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

/// Exit status when the daemon could not be reached after spawning it.
pub const EXIT_RETRIES_EXHAUSTED: u8 = 3;

/// Exit status for every other fatal error.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Error, Debug)]
pub enum DictError {
    #[error("failed to read dictionary {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode dictionary {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("unknown transport {kind:?} in address {spec:?} (expected \"unix\" or \"tcp\")")]
    UnknownTransport { spec: String, kind: String },

    #[error("empty location in address {spec:?}")]
    EmptyLocation { spec: String },
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("failed to connect to daemon at {address} after {attempts} attempts")]
    RetriesExhausted { address: String, attempts: usize },

    #[error("failed to remove stale socket file {}: {source}", path.display())]
    StaleSocket {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn daemon: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("dictionary {} does not exist", path.display())]
    MissingDictionary { path: PathBuf },

    #[error("a daemon is already listening on {address}")]
    AddressInUse { address: String },
}

/// Exit status for a fatal error.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    let exhausted = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<LifecycleError>(),
            Some(LifecycleError::RetriesExhausted { .. })
        )
    });
    if exhausted {
        EXIT_RETRIES_EXHAUSTED
    } else {
        EXIT_FAILURE
    }
}

pub fn exit_code(err: &anyhow::Error) -> ExitCode {
    ExitCode::from(exit_status(err))
}
