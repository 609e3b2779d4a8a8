//! Server-side half of the handshake.
//!
//! Issues challenges and checks responses against every known key and
//! command, the way a NetworkRemote host does. Running the matched command
//! is left to the embedder.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::protocol::{self, STATUS_OK};
use crate::transport::TransportError;

/// Minimum length of challenges, responses and client keys.
pub const MIN_SECRET_LENGTH: usize = 64;

/// How long the responder waits for each client line.
pub const CLIENT_LINE_TIMEOUT: Duration = Duration::from_secs(10);

/// Generate a fresh alphanumeric challenge.
pub fn generate_challenge() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(MIN_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// A response that matched a known client key and command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub client: String,
    pub command: String,
}

/// Verifies client responses.
#[derive(Debug, Clone, Default)]
pub struct Responder {
    greeting: String,
    /// (secret, client name)
    keys: Vec<(String, String)>,
    commands: Vec<String>,
}

impl Responder {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
            ..Self::default()
        }
    }

    /// Accept `secret` as the key of `client`.
    ///
    /// Keys shorter than `MIN_SECRET_LENGTH` are refused.
    pub fn allow_key(
        mut self,
        client: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let (client, secret) = (client.into(), secret.into());
        if secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::KeyTooShort {
                client,
                min: MIN_SECRET_LENGTH,
            });
        }
        self.keys.push((secret, client));
        Ok(self)
    }

    /// Accept `command` as a command identifier.
    pub fn allow_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Whether `line` is the expected hello string.
    pub fn check_greeting(&self, line: &str) -> bool {
        !line.is_empty() && line == self.greeting
    }

    /// Find the key and command whose digest equals `response`.
    pub fn match_response(&self, challenge: &str, response: &str) -> Option<Authorization> {
        if challenge.len() < MIN_SECRET_LENGTH || response.len() < MIN_SECRET_LENGTH {
            return None;
        }
        self.keys.iter().find_map(|(secret, client)| {
            self.commands
                .iter()
                .find(|command| protocol::digest(challenge, secret, command) == response)
                .map(|command| Authorization {
                    client: client.clone(),
                    command: command.clone(),
                })
        })
    }

    /// Serve one TCP client connection with a freshly generated challenge.
    pub fn serve_one(&self, stream: TcpStream) -> Result<Option<Authorization>, TransportError> {
        self.serve_with_challenge(stream, &generate_challenge())
    }

    /// Serve one client connection using `challenge`.
    ///
    /// Returns `Ok(None)` when the greeting or the response is wrong; the
    /// connection is closed without a status in that case.
    pub fn serve_with_challenge(
        &self,
        mut stream: TcpStream,
        challenge: &str,
    ) -> Result<Option<Authorization>, TransportError> {
        stream.set_read_timeout(Some(CLIENT_LINE_TIMEOUT))?;
        let mut reader = BufReader::new(stream.try_clone()?);

        let hello = read_line(&mut reader)?;
        if !self.check_greeting(&hello) {
            info!(client_hello = %hello, "Disconnecting client");
            return Ok(None);
        }

        debug!(%challenge, "Sending challenge");
        stream.write_all(&protocol::line(challenge))?;

        let response = read_line(&mut reader)?;
        let authorization = self.match_response(challenge, &response);
        match &authorization {
            Some(auth) => {
                info!(client = %auth.client, command = %auth.command, "Response is valid");
                stream.write_all(STATUS_OK.as_bytes())?;
                stream.flush()?;
            }
            None => info!("Response does not match any client/command combination"),
        }
        Ok(authorization)
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String, TransportError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(TransportError::Closed);
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
