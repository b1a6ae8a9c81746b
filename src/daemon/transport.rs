//! Connecting and listening on either transport behind one stream type.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

use super::address::{Address, Transport};

pub trait AsyncReadWrite: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T> AsyncReadWrite for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// A connected daemon channel, whichever transport it runs over.
pub type BoxedStream = Box<dyn AsyncReadWrite>;

/// Open a connection to `address`.
pub async fn connect(address: &Address) -> io::Result<BoxedStream> {
    match address.transport {
        Transport::Tcp => {
            let stream = TcpStream::connect(&address.location).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
        #[cfg(unix)]
        Transport::Unix => Ok(Box::new(UnixStream::connect(&address.location).await?)),
        #[cfg(not(unix))]
        Transport::Unix => Err(unix_unsupported()),
    }
}

pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Listener {
    pub async fn bind(address: &Address) -> io::Result<Self> {
        match address.transport {
            Transport::Tcp => Ok(Self::Tcp(TcpListener::bind(&address.location).await?)),
            #[cfg(unix)]
            Transport::Unix => Ok(Self::Unix(UnixListener::bind(&address.location)?)),
            #[cfg(not(unix))]
            Transport::Unix => Err(unix_unsupported()),
        }
    }

    pub async fn accept(&self) -> io::Result<BoxedStream> {
        match self {
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                tracing::debug!("Accepted connection from {peer}");
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Self::Unix(listener) => {
                let (stream, _peer) = listener.accept().await?;
                Ok(Box::new(stream))
            }
        }
    }

    /// The address actually bound; differs from the requested one when a
    /// TCP port of `0` was asked for.
    pub fn local_address(&self, requested: &Address) -> io::Result<Address> {
        match self {
            Self::Tcp(listener) => Ok(Address::tcp(listener.local_addr()?.to_string())),
            #[cfg(unix)]
            Self::Unix(_) => Ok(requested.clone()),
        }
    }
}

#[cfg(not(unix))]
fn unix_unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "unix sockets are not supported on this platform")
}
