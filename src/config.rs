//! Configuration for tracking the real origin of proxied connections.

use serde::Deserialize;
use std::time::Duration;

/// An error in loading a configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Association capacity must be greater than zero.")]
    ZeroCapacity,
    #[error("Association ttl must be greater than zero.")]
    ZeroTtl,
}

/// Bounds of the table associating proxy-observed endpoints with real client endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Maximum number of pending associations. The oldest entry is evicted when full.
    pub capacity: usize,

    /// Seconds an association may wait for its session's first identifying packet.
    /// Must be greater than zero.
    /// Default: 30 seconds
    pub ttl: u64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            ttl: 30,
        }
    }
}

impl AssociationConfig {
    /// Get ttl as Duration
    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

/// PROXY protocol handling policy.
///
/// ## Examples
/// ```rust
/// use proxy_origin::Config;
///
/// let config = Config::from_toml_str(r#"
///     reject_invalid = true
///
///     [association]
///     capacity = 128
/// "#).unwrap();
///
/// assert!(config.reject_invalid);
/// assert!(!config.trust_loopback);
/// assert_eq!(config.association.capacity, 128);
/// assert_eq!(config.association.ttl, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub association: AssociationConfig,

    /// Record headers whose source or target is a loopback address.
    /// Such headers are still stripped when false.
    pub trust_loopback: bool,

    /// Do not record headers carrying the LOCAL command.
    pub ignore_local: bool,

    /// Report input that starts with a signature but is not a valid header as rejected,
    /// instead of passing it through as ordinary data.
    pub reject_invalid: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            association: AssociationConfig::default(),
            trust_loopback: false,
            ignore_local: true,
            reject_invalid: false,
        }
    }
}

impl Config {
    /// Loads a configuration from TOML. Missing keys take their default values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(input)?;

        if config.association.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        if config.association.ttl == 0 {
            return Err(ConfigError::ZeroTtl);
        }

        Ok(config)
    }
}
