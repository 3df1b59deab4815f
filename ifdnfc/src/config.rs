// ifdnfc/src/config.rs

//! Driver configuration

use std::time::Duration;

use crate::constants::DEFAULT_MAX_DEVICES;
use crate::types::Modulation;
use crate::utils::{default_open_retry_interval, default_transceive_timeout};

/// Tunables shared by every slot of a driver instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Size of the slot pool (also reported as simultaneous access)
    pub max_devices: usize,
    /// Minimum delay between reopen attempts triggered by presence checks
    pub open_retry_interval: Duration,
    /// Timeout for APDUs relayed to the target
    pub transceive_timeout: Duration,
    /// Modulations polled during discovery, in priority order
    pub modulations: Vec<Modulation>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_devices: DEFAULT_MAX_DEVICES,
            open_retry_interval: default_open_retry_interval(),
            transceive_timeout: default_transceive_timeout(),
            modulations: vec![Modulation::ISO14443A_106],
        }
    }
}

impl DriverConfig {
    /// Start from the defaults.
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder::new()
    }
}

/// Helper to construct a DriverConfig with non-default values.
#[derive(Debug, Default)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// Builder holding the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`DriverConfig::max_devices`].
    pub fn max_devices(mut self, n: usize) -> Self {
        self.config.max_devices = n;
        self
    }

    /// See [`DriverConfig::open_retry_interval`].
    pub fn open_retry_interval(mut self, interval: Duration) -> Self {
        self.config.open_retry_interval = interval;
        self
    }

    /// See [`DriverConfig::transceive_timeout`].
    pub fn transceive_timeout(mut self, timeout: Duration) -> Self {
        self.config.transceive_timeout = timeout;
        self
    }

    /// Replace the discovery list. An empty list is ignored.
    pub fn modulations(mut self, modulations: Vec<Modulation>) -> Self {
        if !modulations.is_empty() {
            self.config.modulations = modulations;
        }
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> DriverConfig {
        self.config
    }
}
