//! Blocking TCP transport implementation.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, instrument};

use super::traits::{Connector, RemoteTransport, TransportError};

/// TCP stream carrying one handshake.
pub struct TcpTransport {
    stream: TcpStream,
    timeout: Option<Duration>,
}

impl TcpTransport {
    /// Connect to `host:port`.
    ///
    /// With a timeout, each resolved address is tried with that connect
    /// deadline and the same value becomes the read and write deadline.
    #[instrument(level = "debug")]
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let stream = match timeout {
            Some(limit) => Self::connect_with_deadline(host, port, limit)?,
            None => TcpStream::connect((host, port)).map_err(|e| TransportError::ConnectFailed {
                host: host.to_string(),
                port,
                message: e.to_string(),
            })?,
        };

        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        debug!(peer = ?stream.peer_addr().ok(), "Connected");
        Ok(Self { stream, timeout })
    }

    fn connect_with_deadline(
        host: &str,
        port: u16,
        limit: Duration,
    ) -> Result<TcpStream, TransportError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::ResolveFailed {
                host: host.to_string(),
                port,
                message: e.to_string(),
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, limit) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) if is_timeout(&e) => TransportError::Timeout {
                timeout_ms: limit.as_millis() as u64,
            },
            Some(e) => TransportError::ConnectFailed {
                host: host.to_string(),
                port,
                message: e.to_string(),
            },
            None => TransportError::ResolveFailed {
                host: host.to_string(),
                port,
                message: "no addresses".into(),
            },
        })
    }

    fn map_io(&self, e: io::Error, fallback: fn(String) -> TransportError) -> TransportError {
        if is_timeout(&e) {
            TransportError::Timeout {
                timeout_ms: self.timeout.map_or(0, |t| t.as_millis() as u64),
            }
        } else {
            fallback(e.to_string())
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

impl RemoteTransport for TcpTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.stream
            .write_all(data)
            .and_then(|_| self.stream.flush())
            .map_err(|e| self.map_io(e, TransportError::WriteFailed))?;
        debug!(bytes_written = data.len(), "Write complete");
        Ok(data.len())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; max_len];
        let n = self
            .stream
            .read(&mut buf)
            .map_err(|e| self.map_io(e, TransportError::ReadFailed))?;
        buf.truncate(n);
        debug!(bytes_read = n, "Read complete");
        Ok(buf)
    }
}

/// Connector that opens plain TCP connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<TcpTransport, TransportError> {
        TcpTransport::connect(host, port, timeout)
    }
}
