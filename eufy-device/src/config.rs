//! Configuration types for eufy-device

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capability::DeviceClass;
use crate::error::ConfigError;

/// Environment variable overriding [`PollingConfig::poll_interval`], in seconds
pub const POLL_INTERVAL_ENV: &str = "EUFY_POLL_INTERVAL_SECS";

/// Environment variable overriding [`PollingConfig::max_devices`]
pub const MAX_DEVICES_ENV: &str = "EUFY_MAX_DEVICES";

/// Configuration for the polling scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between poll cycles of one device
    /// Default: 5 seconds
    pub poll_interval: Duration,

    /// Maximum number of devices polled at once
    /// Default: 64
    pub max_devices: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_devices: 64,
        }
    }
}

impl PollingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for responsive UIs: poll every second
    pub fn fast_polling() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.max_devices = max_devices;
        self
    }

    /// Defaults, overridden by `EUFY_POLL_INTERVAL_SECS` and `EUFY_MAX_DEVICES`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(POLL_INTERVAL_ENV) {
            let secs = parse_positive(POLL_INTERVAL_ENV, &value)?;
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(value) = lookup(MAX_DEVICES_ENV) {
            let max = parse_positive(MAX_DEVICES_ENV, &value)?;
            config.max_devices = usize::try_from(max).map_err(|_| ConfigError::InvalidEnv {
                var: MAX_DEVICES_ENV,
                value,
            })?;
        }

        Ok(config)
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
        }),
    }
}

/// One device the adapter should mirror
///
/// An empty `name` makes the device's title fall back to its model. Without
/// `class` the class is derived from the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<DeviceClass>,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class: None,
        }
    }

    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.class = Some(class);
        self
    }
}
