//! Daemon server: the accept loop and idle shutdown.
//!
//! The server binds the resolved address, hands every connection to the
//! [`RequestProxy`] on its own task and exits once the idle timer fires.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::timeout;

use super::address::Address;
use super::idle::IdleTimer;
use super::proxy::RequestProxy;
use super::transport::{self, Listener};
use super::LifecycleState;
use crate::dict::Dictionary;
use crate::utils::error::LifecycleError;

/// Bound on checking whether a socket file belongs to a running daemon.
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(1);

pub struct DaemonServer {
    /// Address as bound; for TCP port `0` this carries the real port.
    address: Address,
    listener: Listener,
    proxy: Arc<RequestProxy>,
    idle: Arc<IdleTimer>,
}

impl std::fmt::Debug for DaemonServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonServer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl DaemonServer {
    /// Bind `address` and arm the idle timer.
    ///
    /// A socket file already at the address is replaced only when nothing
    /// answers on it; a live daemon there makes the bind fail.
    pub async fn bind(
        address: &Address,
        dictionary: Arc<Dictionary>,
        idle_timeout: Option<Duration>,
    ) -> Result<Self> {
        if let Some(path) = address.socket_path() {
            if std::fs::symlink_metadata(path).is_ok() {
                if is_live(address).await {
                    return Err(LifecycleError::AddressInUse { address: address.to_string() }.into());
                }
                tracing::debug!("Replacing dead socket file {}", path.display());
                std::fs::remove_file(path).with_context(|| {
                    format!("Failed to remove existing socket file {}", path.display())
                })?;
            }
        }

        let listener =
            Listener::bind(address).await.with_context(|| format!("Failed to bind {address}"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(path) = address.socket_path() {
                let permissions = std::fs::Permissions::from_mode(0o600);
                std::fs::set_permissions(path, permissions)
                    .context("Failed to set socket permissions")?;
            }
        }

        let address = listener.local_address(address)?;
        let idle = Arc::new(IdleTimer::new(idle_timeout));
        let proxy = Arc::new(RequestProxy::new(dictionary, Arc::clone(&idle)));

        tracing::info!(
            "Daemon state: {} on {address} (idle timeout: {})",
            LifecycleState::Listening,
            match idle.timeout() {
                Some(timeout) => format!("{timeout:?}"),
                None => "disabled".to_string(),
            }
        );

        Ok(Self { address, listener, proxy, idle })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Serve until the daemon has been idle for a full timeout.
    pub async fn run(self) -> Result<()> {
        let expired = self.idle.expired();
        tokio::pin!(expired);

        loop {
            tokio::select! {
                biased;

                result = self.listener.accept() => {
                    match result {
                        Ok(stream) => {
                            self.idle.reset();
                            let proxy = Arc::clone(&self.proxy);
                            tokio::spawn(async move {
                                if let Err(err) = proxy.serve_connection(stream).await {
                                    tracing::error!("Connection error: {err:#}");
                                }
                            });
                        }
                        Err(err) => {
                            tracing::error!("Accept error: {err}");
                        }
                    }
                }

                () = &mut expired => {
                    tracing::info!("Daemon state: {}", LifecycleState::IdleShutdown);
                    break;
                }
            }
        }

        self.cleanup()
    }

    fn cleanup(&self) -> Result<()> {
        if let Some(path) = self.address.socket_path() {
            tracing::debug!("Removing socket file {}", path.display());
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("Failed to remove socket file {}", path.display()))
                }
            }
        }
        Ok(())
    }
}

/// Whether something accepts connections at `address`.
async fn is_live(address: &Address) -> bool {
    matches!(timeout(LIVENESS_TIMEOUT, transport::connect(address)).await, Ok(Ok(_)))
}
