//! Dispatcher - resolves aliases and hands the handshake to the session.

use tracing::{debug, instrument};

use crate::config::{CommandRecord, DeviceRecord, RemoteConfig};
use crate::error::{SendError, SendOutcome};
use crate::events::{RemoteEvent, RemoteObserver, Severity, TracingObserver};
use crate::protocol::DEFAULT_TIMEOUT_SECS;
use crate::session::HandshakeSession;
use crate::transport::{Connector, TcpConnector};

/// Sends named commands to named devices.
///
/// Holds the configuration read-only, so one dispatcher can serve calls
/// from several threads; each call opens its own connection.
pub struct Dispatcher<C: Connector = TcpConnector, O: RemoteObserver = TracingObserver> {
    config: RemoteConfig,
    session: HandshakeSession<C, O>,
}

impl Dispatcher {
    /// Create a dispatcher talking TCP and logging through tracing.
    pub fn new(config: RemoteConfig) -> Self {
        Self::with_session(config, HandshakeSession::new())
    }
}

impl<C: Connector, O: RemoteObserver> Dispatcher<C, O> {
    /// Create a dispatcher around a custom session.
    pub fn with_session(config: RemoteConfig, session: HandshakeSession<C, O>) -> Self {
        Self { config, session }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn session(&self) -> &HandshakeSession<C, O> {
        &self.session
    }

    /// Send `command` to `device` with the default timeout.
    pub fn send(&self, device: &str, command: &str) -> bool {
        self.send_with_timeout(device, command, DEFAULT_TIMEOUT_SECS)
    }

    /// Send `command` to `device`. `timeout_secs <= 0` disables the deadline.
    pub fn send_with_timeout(&self, device: &str, command: &str, timeout_secs: i64) -> bool {
        self.dispatch(device, command, timeout_secs).is_success()
    }

    /// Send and return the outcome as a value instead of a flag.
    #[instrument(skip(self))]
    pub fn dispatch(&self, device: &str, command: &str, timeout_secs: i64) -> SendOutcome {
        let (greeting, device, command) = match self.resolve(device, command) {
            Ok(resolved) => resolved,
            Err(e) => {
                let severity = match e {
                    SendError::ConfigurationMissing => Severity::Error,
                    _ => Severity::Warn,
                };
                self.session.observer().on_event(&RemoteEvent::Advisory {
                    severity,
                    message: e.to_string(),
                });
                return SendOutcome::Failed(e);
            }
        };

        self.session.observer().on_event(&RemoteEvent::Sending {
            command: command.alias.clone(),
            device: device.alias.clone(),
        });
        debug!(host = %device.host, port = device.port, "Resolved device");

        self.session.execute(
            &device.host,
            device.port,
            timeout_secs,
            greeting,
            &device.secret,
            &command.command_id,
        )
    }

    fn resolve(
        &self,
        device: &str,
        command: &str,
    ) -> Result<(&str, &DeviceRecord, &CommandRecord), SendError> {
        let greeting = self
            .config
            .greeting()
            .ok_or(SendError::ConfigurationMissing)?;

        let device = device.to_lowercase();
        let command = command.to_lowercase();

        let device = self
            .config
            .device(&device)
            .ok_or(SendError::UnknownDevice(device))?;
        let command = self
            .config
            .command(&command)
            .ok_or(SendError::UnknownCommand(command))?;

        Ok((greeting, device, command))
    }
}
