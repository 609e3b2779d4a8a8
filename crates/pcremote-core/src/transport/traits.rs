//! Stream transport abstraction.
//!
//! Defines the `RemoteTransport` trait for one handshake connection and the
//! `Connector` trait that opens it, allowing different implementations
//! (TCP, mock, etc.).

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to resolve {host}:{port}: {message}")]
    ResolveFailed {
        host: String,
        port: u16,
        message: String,
    },

    #[error("Failed to connect to {host}:{port}: {message}")]
    ConnectFailed {
        host: String,
        port: u16,
        message: String,
    },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Received bytes are not valid UTF-8")]
    Decode,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One open connection to a remote host.
pub trait RemoteTransport {
    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Perform a single read of at most `max_len` bytes.
    ///
    /// Returns whatever the peer delivered in that read, which may be fewer
    /// bytes than were sent. A peer that closed the connection yields an
    /// empty vector.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Single bounded read decoded as UTF-8.
    fn read_text(&mut self, max_len: usize) -> Result<String, TransportError> {
        let bytes = self.read(max_len)?;
        String::from_utf8(bytes).map_err(|_| TransportError::Decode)
    }
}

/// Opens a fresh transport per handshake.
///
/// `timeout` of `None` means every operation may block indefinitely.
pub trait Connector: Send + Sync {
    type Transport: RemoteTransport;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self::Transport, TransportError>;
}
