//! Configuration Module
//!
//! Centralized configuration for the ambient, non-secret parts of a CMP
//! deployment: server address, transport timeouts, default digest and POPO
//! method, and output file paths. Deliberately separate from [`crate::context::CmpContext`]:
//! this is what a driver loads from disk and feeds into a freshly-built
//! context. It never holds private key material or shared secrets — those
//! are supplied programmatically and zeroized on drop.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::{DigestAlgorithm, PopoMethod};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// CA/RA server endpoint
    pub server: ServerConfig,

    /// Transport timeouts and proxy
    pub transport: TransportConfig,

    /// Protocol-level defaults applied when the caller does not override them
    pub defaults: ProtocolDefaults,

    /// Output file paths written on a successful transaction
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            transport: TransportConfig::default(),
            defaults: ProtocolDefaults::default(),
            output: OutputConfig::default(),
        }
    }
}

/// CA/RA server endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname or address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Request path, e.g. `/pkix/`
    pub path: String,

    /// Use TLS for the connection to the server
    pub tls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            path: "/pkix/".to_string(),
            tls: false,
        }
    }
}

/// Transport timeout and proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-message timeout in seconds; `0` disables the per-message timeout
    pub msg_timeout_secs: u64,

    /// Overall transaction timeout in seconds; `0` disables the total timeout
    pub total_timeout_secs: u64,

    /// Optional plain HTTP proxy (`host:port`); TLS through a proxy is rejected
    pub proxy: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            msg_timeout_secs: 120,
            total_timeout_secs: 0,
            proxy: None,
        }
    }
}

/// Protocol-level defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolDefaults {
    /// Default digest algorithm for signature protection and POPO signing
    pub digest: DigestAlgorithm,

    /// Default proof-of-possession method
    pub popo: PopoMethod,

    /// Default poll interval in seconds, used absent a server-supplied `checkAfter`
    pub check_after_secs: u64,

    /// Validity period in days requested for newly enrolled certificates
    pub validity_days: u32,
}

impl Default for ProtocolDefaults {
    fn default() -> Self {
        Self {
            digest: DigestAlgorithm::default(),
            popo: PopoMethod::default(),
            check_after_secs: 1,
            validity_days: 0,
        }
    }
}

/// Output file paths written on a successful transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where to write the newly enrolled certificate
    pub certout: Option<PathBuf>,

    /// Where to write received `extraCerts`
    pub extracertsout: Option<PathBuf>,

    /// Where to write received `caPubs`
    pub cacertsout: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            certout: None,
            extracertsout: None,
            cacertsout: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration for internally-consistent, sendable options
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "server host cannot be empty".to_string(),
            ));
        }

        if self.server.tls && self.transport.proxy.is_some() {
            return Err(ConfigError::InvalidConfig(
                "TLS through a proxy is not supported".to_string(),
            ));
        }

        Ok(())
    }
}
