//! pcremote-core: challenge-response remote control client in Rust.
//!
//! Sends a named command to a named host running the NetworkRemote service.
//! The client proves it knows the host's key without sending it: the server
//! picks a challenge and the client answers with
//! `sha256(challenge + key + command)`, which binds the key and the chosen
//! command to that one exchange.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Constants, framing helpers, response digest
//! - **Transport**: Stream abstraction (TCP, mock)
//! - **Session**: One handshake as a state machine
//! - **Dispatcher**: Alias resolution in front of the session
//! - **Config**: Hello string and alias tables, loadable from TOML
//! - **Events**: Observer pattern for advisory output
//! - **Responder**: Server-side challenge generation and verification
//!
//! # Example
//!
//! ```no_run
//! use pcremote_core::{Dispatcher, RemoteConfig};
//!
//! let config = RemoteConfig::load_from_file("pcremote.toml").expect("bad config");
//! let dispatcher = Dispatcher::new(config);
//! if !dispatcher.send("mypc", "poweroff") {
//!     eprintln!("command was not acknowledged");
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod protocol;
pub mod responder;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use config::{CommandRecord, ConfigError, DeviceRecord, RemoteConfig};
pub use dispatcher::Dispatcher;
pub use error::{SendError, SendOutcome};
pub use events::{
    HandshakePhase, NullObserver, RecordingObserver, RemoteEvent, RemoteObserver, Severity,
    TracingObserver,
};
pub use protocol::digest;
pub use responder::{Authorization, Responder};
pub use session::HandshakeSession;
pub use transport::{
    Connector, MockConnector, MockTransport, RemoteTransport, TcpConnector, TcpTransport,
    TransportError,
};
