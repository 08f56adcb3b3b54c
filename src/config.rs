use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::netconf::framing::DEFAULT_MAX_FRAME_BYTES;
use crate::netconf::SessionSettings;
use crate::topology::{ConnectPolicy, Preset};

/// Smallest frame limit accepted; a server hello alone is a few hundred bytes
const MIN_FRAME_BYTES: usize = 1024;

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub general: GeneralConfig,
    pub topology: TopologyConfig,
    pub netconf: NetconfConfig,
}

impl SimulatorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if level.trim().is_empty() {
                return Err(ValidationError::InvalidGeneral(
                    "log_level cannot be empty".to_string(),
                ));
            }
        }

        self.netconf.listen_addr()?;

        if self.netconf.hello_timeout.is_zero() {
            return Err(ValidationError::InvalidNetconf(
                "hello_timeout must be greater than zero".to_string(),
            ));
        }

        if self.netconf.max_frame_bytes < MIN_FRAME_BYTES {
            return Err(ValidationError::InvalidNetconf(format!(
                "max_frame_bytes must be at least {}, got {}",
                MIN_FRAME_BYTES, self.netconf.max_frame_bytes
            )));
        }

        Ok(())
    }
}

/// Shared general configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `env_logger` filter; `RUST_LOG` takes precedence when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Which topology to seed and how connects treat busy ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub preset: Preset,
    pub connect_policy: ConnectPolicy,
}

/// Management session listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetconfConfig {
    pub listen: String,
    #[serde(with = "humantime_serde")]
    pub hello_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl NetconfConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ValidationError> {
        self.listen.parse().map_err(|_| {
            ValidationError::InvalidNetconf(format!(
                "listen address '{}' is not a valid socket address",
                self.listen
            ))
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            hello_timeout: self.hello_timeout,
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid topology configuration: {0}")]
    InvalidTopology(String),
    #[error("Invalid netconf configuration: {0}")]
    InvalidNetconf(String),
}

/// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            preset: Preset::LongHaul,
            connect_policy: ConnectPolicy::Reject,
        }
    }
}

impl Default for NetconfConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8830".to_string(),
            hello_timeout: Duration::from_secs(60),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}
