//! Handshake session - drives one challenge-response exchange.

use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, trace};

use crate::error::{SendError, SendOutcome};
use crate::events::{HandshakePhase, RemoteEvent, RemoteObserver, Severity, TracingObserver};
use crate::protocol::{self, CHALLENGE_READ_LEN, STATUS_OK, STATUS_READ_LEN};
use crate::transport::{Connector, RemoteTransport, TcpConnector, TransportError};

/// Per-call handshake state. Lives only for one attempt.
struct HandshakeContext<'a> {
    challenge: String,
    secret: &'a str,
    command_id: &'a str,
}

impl HandshakeContext<'_> {
    fn response(&self) -> String {
        protocol::digest(&self.challenge, self.secret, self.command_id)
    }
}

/// Convert a caller timeout in seconds to a deadline.
///
/// Zero or negative means no deadline.
pub fn deadline(timeout_secs: i64) -> Option<Duration> {
    u64::try_from(timeout_secs)
        .ok()
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
}

/// Runs handshakes over connections opened by `C`.
pub struct HandshakeSession<C: Connector = TcpConnector, O: RemoteObserver = TracingObserver> {
    connector: C,
    observer: Arc<O>,
}

impl HandshakeSession {
    /// Create a TCP session with the default tracing observer.
    pub fn new() -> Self {
        Self::with_parts(TcpConnector, Arc::new(TracingObserver))
    }
}

impl Default for HandshakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector, O: RemoteObserver> HandshakeSession<C, O> {
    /// Create a session with a custom connector and observer.
    pub fn with_parts(connector: C, observer: Arc<O>) -> Self {
        Self {
            connector,
            observer,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn observer(&self) -> &Arc<O> {
        &self.observer
    }

    /// Perform one handshake and report whether the server said `OK`.
    ///
    /// Failures are reported to the observer, never returned as errors.
    pub fn attempt(
        &self,
        host: &str,
        port: u16,
        timeout_secs: i64,
        greeting: &str,
        secret: &str,
        command_id: &str,
    ) -> bool {
        self.execute(host, port, timeout_secs, greeting, secret, command_id)
            .is_success()
    }

    /// Same as [`attempt`](Self::attempt), returning the outcome as a value.
    #[instrument(skip(self, greeting, secret))]
    pub fn execute(
        &self,
        host: &str,
        port: u16,
        timeout_secs: i64,
        greeting: &str,
        secret: &str,
        command_id: &str,
    ) -> SendOutcome {
        let mut phase = HandshakePhase::Connecting;
        let result = self.run(
            &mut phase,
            host,
            port,
            deadline(timeout_secs),
            greeting,
            secret,
            command_id,
        );

        match &result {
            Ok(()) => self.observer.on_event(&RemoteEvent::Completed),
            Err(e) => {
                self.transition(&mut phase, HandshakePhase::Failed);
                self.observer.on_event(&RemoteEvent::Advisory {
                    severity: Severity::Warn,
                    message: e.to_string(),
                });
            }
        }
        result.into()
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        phase: &mut HandshakePhase,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
        greeting: &str,
        secret: &str,
        command_id: &str,
    ) -> Result<(), SendError> {
        let mut transport = self
            .connector
            .connect(host, port, timeout)
            .map_err(failed_in(HandshakePhase::Connecting))?;

        transport
            .write(&protocol::line(greeting))
            .map_err(failed_in(HandshakePhase::GreetingSent))?;
        self.transition(phase, HandshakePhase::GreetingSent);

        let text = transport
            .read_text(CHALLENGE_READ_LEN)
            .map_err(failed_in(HandshakePhase::ChallengeReceived))?;
        if text.is_empty() {
            return Err(failed_in(HandshakePhase::ChallengeReceived)(
                TransportError::Closed,
            ));
        }
        let ctx = HandshakeContext {
            challenge: protocol::challenge_token(&text).to_string(),
            secret,
            command_id,
        };
        trace!(challenge = %ctx.challenge, "Challenge received");
        self.transition(phase, HandshakePhase::ChallengeReceived);

        transport
            .write(&protocol::line(&ctx.response()))
            .map_err(failed_in(HandshakePhase::ResponseSent))?;
        self.transition(phase, HandshakePhase::ResponseSent);

        let status = transport
            .read_text(STATUS_READ_LEN)
            .map_err(failed_in(HandshakePhase::Completed))?;
        if status != STATUS_OK {
            return Err(SendError::ProtocolMismatch { status });
        }
        self.transition(phase, HandshakePhase::Completed);
        Ok(())
    }

    fn transition(&self, phase: &mut HandshakePhase, to: HandshakePhase) {
        self.observer.on_event(&RemoteEvent::PhaseChanged { from: *phase, to });
        *phase = to;
    }
}

fn failed_in(phase: HandshakePhase) -> impl Fn(TransportError) -> SendError {
    move |source| SendError::Transport { phase, source }
}
