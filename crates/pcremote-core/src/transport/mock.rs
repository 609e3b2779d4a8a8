//! Mock transport for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{Connector, RemoteTransport, TransportError};

/// Mock transport for unit testing the handshake state machine.
///
/// Clones share the same queues, so a test can keep a handle after the
/// session has taken ownership of the transport.
#[derive(Clone)]
pub struct MockTransport {
    /// Queued chunks returned one per read.
    read_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Whether the peer is "connected".
    connected: Arc<Mutex<bool>>,
    /// Number of writes that succeed before every further write fails.
    write_budget: Arc<Mutex<Option<usize>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            read_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
            write_budget: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue a chunk to be returned on the next read.
    pub fn queue_read(&self, bytes: &[u8]) {
        self.read_queue.lock().unwrap().push_back(bytes.to_vec());
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// Captured writes decoded as text.
    pub fn written_lines(&self) -> Vec<String> {
        self.get_writes()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Simulate the peer closing the connection.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self) {
        self.fail_writes_after(0);
    }

    /// Let `count` more writes through, then fail the rest.
    pub fn fail_writes_after(&self, count: usize) {
        *self.write_budget.lock().unwrap() = Some(count);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteTransport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if let Some(budget) = self.write_budget.lock().unwrap().as_mut() {
            if *budget == 0 {
                return Err(TransportError::WriteFailed("Broken pipe".into()));
            }
            *budget -= 1;
        }
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Closed);
        }
        self.write_log.lock().unwrap().push(data.to_vec());
        Ok(data.len())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut queue = self.read_queue.lock().unwrap();
        match queue.pop_front() {
            Some(mut chunk) => {
                if chunk.len() > max_len {
                    let rest = chunk.split_off(max_len);
                    queue.push_front(rest);
                }
                Ok(chunk)
            }
            // Peer hung up: the same zero-length read a socket reports.
            None if !*self.connected.lock().unwrap() => Ok(Vec::new()),
            None => Err(TransportError::Timeout { timeout_ms: 5000 }),
        }
    }
}

/// Connector handing out a prepared `MockTransport`.
pub struct MockConnector {
    transport: MockTransport,
    refuse: bool,
    attempts: AtomicUsize,
    last_target: Mutex<Option<(String, u16, Option<Duration>)>>,
}

impl MockConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            refuse: false,
            attempts: AtomicUsize::new(0),
            last_target: Mutex::new(None),
        }
    }

    /// Connector whose every connect attempt is refused.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(MockTransport::new())
        }
    }

    /// Number of connect attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Host, port and timeout of the most recent connect attempt.
    pub fn last_target(&self) -> Option<(String, u16, Option<Duration>)> {
        self.last_target.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<MockTransport, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self.last_target.lock().unwrap() = Some((host.to_string(), port, timeout));
        if self.refuse {
            return Err(TransportError::ConnectFailed {
                host: host.to_string(),
                port,
                message: "Connection refused".into(),
            });
        }
        Ok(self.transport.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_read_queue() {
        let mut mock = MockTransport::new();
        mock.queue_read(b"abc123\n");
        mock.queue_read(b"OK");

        assert_eq!(mock.read_text(1024).unwrap(), "abc123\n");
        assert_eq!(mock.read_text(128).unwrap(), "OK");

        // Queue is empty now
        assert!(matches!(mock.read(128), Err(TransportError::Timeout { .. })));
    }

    #[test]
    fn test_mock_read_respects_max_len() {
        let mut mock = MockTransport::new();
        mock.queue_read(b"abcdef");
        assert_eq!(mock.read(4).unwrap(), b"abcd");
        assert_eq!(mock.read(4).unwrap(), b"ef");
    }

    #[test]
    fn test_mock_write_capture() {
        let mut mock = MockTransport::new();
        mock.write(b"Hello").unwrap();
        mock.write(b"World").unwrap();

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"Hello");
        assert_eq!(writes[1], b"World");
    }

    #[test]
    fn test_mock_disconnect() {
        let mut mock = MockTransport::new();
        mock.disconnect();
        assert!(mock.write(b"test").is_err());
        assert!(mock.read(16).unwrap().is_empty());
    }

    #[test]
    fn test_mock_fail_writes_after() {
        let mut mock = MockTransport::new();
        mock.fail_writes_after(1);
        assert!(mock.write(b"first").is_ok());
        assert!(matches!(
            mock.write(b"second"),
            Err(TransportError::WriteFailed(_))
        ));
        assert_eq!(mock.get_writes(), vec![b"first".to_vec()]);
    }

    #[test]
    fn test_mock_decode_failure() {
        let mut mock = MockTransport::new();
        mock.queue_read(&[0xff, 0xfe]);
        assert!(matches!(mock.read_text(16), Err(TransportError::Decode)));
    }

    #[test]
    fn test_mock_connector_counts_attempts() {
        let connector = MockConnector::refusing();
        assert!(connector.connect("10.0.0.1", 10545, None).is_err());
        assert_eq!(connector.attempts(), 1);
        assert_eq!(
            connector.last_target(),
            Some(("10.0.0.1".to_string(), 10545, None))
        );
    }
}
