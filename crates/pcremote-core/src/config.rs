//! Client configuration: the hello string and the two alias tables.
//!
//! A `RemoteConfig` is built once (from a TOML file or programmatically)
//! and then handed to the `Dispatcher`, which only ever reads it.
//!
//! ```toml
//! [protocol]
//! hello_string = "..."
//!
//! [devices]
//! MyPC = "192.168.1.20:10545|api-key"
//!
//! [commands]
//! PowerOff = "shutdown"
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pcremote.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid Host|API-Key definition for \"{0}\"")]
    InvalidDeviceEntry(String),

    #[error("Invalid IP:Port definition for \"{0}\"")]
    InvalidAddress(String),

    #[error("Invalid port for \"{alias}\": {value}")]
    InvalidPort { alias: String, value: String },

    #[error("Key for \"{client}\" is too short (must be >= {min} chars)")]
    KeyTooShort { client: String, min: usize },
}

/// Normalized table key: trimmed and lowercased.
pub fn normalize_alias(alias: &str) -> String {
    alias.trim().to_lowercase()
}

/// A remote host that accepts commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub alias: String,
    pub host: String,
    pub port: u16,
    pub secret: String,
}

impl DeviceRecord {
    pub fn new(
        alias: &str,
        host: impl Into<String>,
        port: u16,
        secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let alias = normalize_alias(alias);
        if port == 0 {
            return Err(ConfigError::InvalidPort {
                alias,
                value: port.to_string(),
            });
        }
        Ok(Self {
            alias,
            host: host.into(),
            port,
            secret: secret.into(),
        })
    }

    /// Parse a `host:port|secret` definition.
    pub fn parse(alias: &str, definition: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = definition.split('|').collect();
        let [address, secret] = parts.as_slice() else {
            return Err(ConfigError::InvalidDeviceEntry(normalize_alias(alias)));
        };
        let host_port: Vec<&str> = address.split(':').collect();
        let [host, port] = host_port.as_slice() else {
            return Err(ConfigError::InvalidAddress(normalize_alias(alias)));
        };
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::InvalidPort {
            alias: normalize_alias(alias),
            value: port.to_string(),
        })?;
        Self::new(alias, *host, port, *secret)
    }
}

/// A command alias and the identifier the server knows it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub alias: String,
    pub command_id: String,
}

impl CommandRecord {
    pub fn new(alias: &str, command_id: impl Into<String>) -> Self {
        Self {
            alias: normalize_alias(alias),
            command_id: command_id.into(),
        }
    }
}

/// Immutable client configuration.
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    greeting: Option<String>,
    devices: HashMap<String, DeviceRecord>,
    commands: HashMap<String, CommandRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    protocol: RawProtocol,
    #[serde(default)]
    devices: toml::Table,
    #[serde(default)]
    commands: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
struct RawProtocol {
    hello_string: Option<String>,
}

impl RemoteConfig {
    /// Create an empty configuration with the given hello string.
    ///
    /// An empty string counts as "not configured".
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            greeting: (!greeting.is_empty()).then_some(greeting),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loading configuration");
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    ///
    /// Malformed device entries and duplicate aliases are skipped with a
    /// warning; only a syntactically broken document is an error.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut config = Self::new(raw.protocol.hello_string.unwrap_or_default());
        if !config.has_greeting() {
            warn!("No hello_string defined in config, please configure");
            return Ok(config);
        }

        for (alias, value) in &raw.devices {
            let Some(definition) = value.as_str() else {
                warn!(device = %alias, "Skipping non-string device definition");
                continue;
            };
            match DeviceRecord::parse(alias, definition) {
                Ok(record) => {
                    config.add_device(record);
                }
                Err(e) => warn!("Skipping device: {}", e),
            }
        }

        for (alias, value) in &raw.commands {
            let Some(command_id) = value.as_str() else {
                warn!(command = %alias, "Skipping non-string command definition");
                continue;
            };
            config.add_command(CommandRecord::new(alias, normalize_alias(command_id)));
        }

        debug!(
            devices = config.devices.len(),
            commands = config.commands.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Register a device. The first definition of an alias wins.
    pub fn add_device(&mut self, record: DeviceRecord) -> bool {
        match self.devices.entry(record.alias.clone()) {
            Entry::Occupied(_) => {
                warn!(device = %record.alias, "Duplicate device, keeping the first one");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Register a command alias. The first definition of an alias wins.
    pub fn add_command(&mut self, record: CommandRecord) -> bool {
        match self.commands.entry(record.alias.clone()) {
            Entry::Occupied(_) => {
                warn!(command = %record.alias, "Duplicate command, keeping the first one");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    pub fn has_greeting(&self) -> bool {
        self.greeting.is_some()
    }

    /// Look up a device by an already-lowercased alias.
    pub fn device(&self, alias: &str) -> Option<&DeviceRecord> {
        self.devices.get(alias)
    }

    /// Look up a command by an already-lowercased alias.
    pub fn command(&self, alias: &str) -> Option<&CommandRecord> {
        self.commands.get(alias)
    }

    /// Device aliases, sorted.
    pub fn device_aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.devices.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Command aliases, sorted.
    pub fn command_aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }
}
