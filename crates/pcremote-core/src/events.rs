//! Event system for surfacing advisory messages.
//!
//! The core never prints. Progress notices and failure reasons are handed
//! to a `RemoteObserver`, so the CLI, a daemon or a test can decide what to
//! do with them.

use std::fmt;
use std::sync::Mutex;

/// Handshake phases, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Opening the stream connection.
    Connecting,
    /// Greeting line written.
    GreetingSent,
    /// Challenge token read from the server.
    ChallengeReceived,
    /// Digest line written.
    ResponseSent,
    /// Server answered `OK`.
    Completed,
    /// Any step failed.
    Failed,
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakePhase::Connecting => write!(f, "Connecting"),
            HandshakePhase::GreetingSent => write!(f, "Greeting Sent"),
            HandshakePhase::ChallengeReceived => write!(f, "Challenge Received"),
            HandshakePhase::ResponseSent => write!(f, "Response Sent"),
            HandshakePhase::Completed => write!(f, "Completed"),
            HandshakePhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Severity of an advisory message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
}

/// Events emitted while dispatching a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    /// A command is about to be sent.
    Sending { command: String, device: String },
    /// Handshake phase changed.
    PhaseChanged {
        from: HandshakePhase,
        to: HandshakePhase,
    },
    /// Something went wrong; the call will return `false`.
    Advisory { severity: Severity, message: String },
    /// The server acknowledged the command.
    Completed,
}

/// Observer trait for receiving dispatch events.
pub trait RemoteObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &RemoteEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl RemoteObserver for NullObserver {
    fn on_event(&self, _event: &RemoteEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl RemoteObserver for TracingObserver {
    fn on_event(&self, event: &RemoteEvent) {
        match event {
            RemoteEvent::Sending { command, device } => {
                tracing::info!(%command, %device, "Sending command {} to {}", command, device);
            }
            RemoteEvent::PhaseChanged { from, to } => {
                tracing::debug!(from = %from, to = %to, "Phase changed");
            }
            RemoteEvent::Advisory { severity, message } => match severity {
                Severity::Warn => tracing::warn!("{}", message),
                Severity::Error => tracing::error!("{}", message),
            },
            RemoteEvent::Completed => {
                tracing::info!("Command acknowledged");
            }
        }
    }
}

/// Observer that records every event, for tests and embedding.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RemoteEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<RemoteEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Recorded advisory messages only.
    pub fn advisories(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RemoteEvent::Advisory { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Phases entered, in order.
    pub fn phases(&self) -> Vec<HandshakePhase> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RemoteEvent::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }
}

impl RemoteObserver for RecordingObserver {
    fn on_event(&self, event: &RemoteEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
