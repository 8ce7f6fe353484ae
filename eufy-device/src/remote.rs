//! The remote device handle seam
//!
//! A `RemoteDevice` is a live connection to one physical plug or bulb. The
//! vendor protocol lives behind this trait; the bridge only needs to connect,
//! refresh, read the last refreshed fields, and push partial state changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// An RGB color triple as reported by color bulbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self { red, green, blue }
    }
}

/// A partial state change pushed to a device
///
/// Fields left as `None` are not touched on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChange {
    pub power: Option<bool>,
    /// Brightness, 0-100
    pub brightness: Option<u8>,
    /// Relative color temperature, 0-100
    pub temperature: Option<u8>,
    pub colors: Option<Rgb>,
}

impl StateChange {
    pub fn power(on: bool) -> Self {
        Self {
            power: Some(on),
            ..Default::default()
        }
    }

    pub fn brightness(level: u8) -> Self {
        Self {
            brightness: Some(level),
            ..Default::default()
        }
    }

    pub fn temperature(relative: u8) -> Self {
        Self {
            temperature: Some(relative),
            ..Default::default()
        }
    }

    pub fn colors(rgb: Rgb) -> Self {
        Self {
            colors: Some(rgb),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Handle to one physical Eufy device
///
/// Field accessors return the values captured by the last successful
/// `update()`; they never touch the network. Switches and plugs only report
/// power, so the bulb-specific accessors default to "nothing set".
#[async_trait]
pub trait RemoteDevice: Send + Sync {
    /// Vendor model identifier (e.g. `T1013`)
    fn model(&self) -> &str;

    /// Establish the transport. Idempotent.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Refresh every field from the device. Idempotent.
    ///
    /// Fails with `TransportError::BrokenPipe` when the transport dropped.
    async fn update(&mut self) -> Result<(), TransportError>;

    /// Push a partial state change to the device
    async fn set_state(&mut self, change: StateChange) -> Result<(), TransportError>;

    fn power(&self) -> bool;

    /// Brightness, 0-100
    fn brightness(&self) -> u8 {
        0
    }

    /// Current color, `None` when the bulb is in white mode or has no color
    fn colors(&self) -> Option<Rgb> {
        None
    }

    /// Relative color temperature, 0-100
    fn temperature(&self) -> u8 {
        0
    }
}
