//! Device configuration and validation
//!
//! Configuration is assembled by the firmware from build-time inputs and
//! validated before any peripheral is touched. Credential problems must
//! surface as a configuration error, distinct from a connection failure.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::link::DEFAULT_RETRY_LIMIT;

/// Settle time after exciting a pair, before sampling is valid.
pub const DEFAULT_SETTLE_MS: u32 = 100;
/// Idle time between pairs; bounds duty cycle and electrode stress.
pub const DEFAULT_REST_MS: u32 = 500;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("station credentials are not set")]
    MissingCredentials,
    #[error("{0} electrodes cannot form an excitation pair")]
    TooFewElectrodes(usize),
    #[error("drive pin {0} is mapped to more than one electrode")]
    DuplicatePin(u8),
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub endpoint: EndpointConfig<'a>,
    pub scan: ScanConfig,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Where encoded records are POSTed to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct EndpointConfig<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ScanConfig {
    pub settle_ms: u32,
    pub rest_ms: u32,
    pub retry_limit: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            rest_ms: DEFAULT_REST_MS,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

impl Config<'_> {
    /// Fail fast on inputs that would otherwise surface much later as
    /// connection failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.internet.ssid.is_empty() || self.internet.password.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(())
    }
}

/// Validate an electrode-to-pin mapping table: enough electrodes to form
/// a pair, and no pin assigned twice.
pub fn validate_drive_pins(pins: &[u8]) -> Result<(), ConfigError> {
    if pins.len() < 2 {
        return Err(ConfigError::TooFewElectrodes(pins.len()));
    }
    for (index, pin) in pins.iter().enumerate() {
        if pins[..index].contains(pin) {
            return Err(ConfigError::DuplicatePin(*pin));
        }
    }
    Ok(())
}
