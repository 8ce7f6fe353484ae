//! Property mirrors
//!
//! A property mirror keeps one gateway property in sync with one field of a
//! remote device. Each property is a zero-sized marker type implementing
//! [`MirroredProperty`], which ties together:
//!
//! - the property name and its gateway description
//! - the typed value it carries
//! - how to read that value from a [`RemoteDevice`]
//!
//! Writable properties additionally implement [`WritableProperty`], which
//! turns a validated gateway value into a [`StateChange`] for the device.
//!
//! ```rust,ignore
//! let mut level = PropertyMirror::<Level>::new("eufy-1", &remote);
//!
//! // After the remote handle refreshed:
//! if level.refresh(&remote, &registry)? {
//!     println!("brightness now {}", level.value());
//! }
//!
//! // Client write, validated against the description first
//! level.apply_write(&mut remote, &registry, &PropertyValue::Integer(40)).await?;
//! ```

use std::fmt;
use std::marker::PhantomData;

use eufy_registry::{
    PropertyDescription, PropertyValue, Registry, RegistryError, ValidationError, ValueType,
};
use tracing::debug;

use crate::convert::{
    color_to_hex, kelvin_to_relative, parse_hex_color, relative_to_kelvin, MAX_TEMPERATURE,
    MIN_TEMPERATURE, NO_COLOR,
};
use crate::error::{DeviceError, Result};
use crate::remote::{RemoteDevice, StateChange};

/// A device attribute mirrored into the gateway
pub trait MirroredProperty: Send + Sync + 'static {
    /// Property name, unique within a device
    const NAME: &'static str;

    /// Typed value; compared with `PartialEq` to detect changes
    type Value: Clone + PartialEq + fmt::Debug + Into<PropertyValue> + Send + Sync;

    /// Gateway description of this property
    fn description() -> PropertyDescription;

    /// Read the current value from the last refreshed remote state
    fn read(remote: &dyn RemoteDevice) -> Self::Value;
}

/// A mirrored property that clients may write
pub trait WritableProperty: MirroredProperty {
    /// Convert a value that passed description validation into the typed
    /// value the device will report and the change to push
    fn to_change(
        value: &PropertyValue,
    ) -> std::result::Result<(Self::Value, StateChange), ValidationError>;
}

// ============================================================================
// Built-in properties
// ============================================================================

/// Power state
#[derive(Debug, Clone, Copy)]
pub struct On;

impl MirroredProperty for On {
    const NAME: &'static str = "on";
    type Value = bool;

    fn description() -> PropertyDescription {
        PropertyDescription::new(Self::NAME, "OnOffProperty", "On/Off", ValueType::Boolean)
    }

    fn read(remote: &dyn RemoteDevice) -> bool {
        remote.power()
    }
}

impl WritableProperty for On {
    fn to_change(
        value: &PropertyValue,
    ) -> std::result::Result<(bool, StateChange), ValidationError> {
        let on = value.as_bool().ok_or_else(|| mismatch::<Self>(value))?;
        Ok((on, StateChange::power(on)))
    }
}

/// Brightness in percent
#[derive(Debug, Clone, Copy)]
pub struct Level;

impl MirroredProperty for Level {
    const NAME: &'static str = "level";
    type Value = u8;

    fn description() -> PropertyDescription {
        PropertyDescription::new(Self::NAME, "BrightnessProperty", "Brightness", ValueType::Integer)
            .with_unit("percent")
            .with_range(0, 100)
    }

    fn read(remote: &dyn RemoteDevice) -> u8 {
        remote.brightness()
    }
}

impl WritableProperty for Level {
    fn to_change(
        value: &PropertyValue,
    ) -> std::result::Result<(u8, StateChange), ValidationError> {
        let level = value
            .as_i64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| mismatch::<Self>(value))?;
        Ok((level, StateChange::brightness(level)))
    }
}

/// Color as `#RRGGBB`; `#000000` when the bulb reports no color
#[derive(Debug, Clone, Copy)]
pub struct Color;

impl MirroredProperty for Color {
    const NAME: &'static str = "color";
    type Value = String;

    fn description() -> PropertyDescription {
        PropertyDescription::new(Self::NAME, "ColorProperty", "Color", ValueType::String)
    }

    fn read(remote: &dyn RemoteDevice) -> String {
        color_to_hex(remote.colors())
    }
}

impl WritableProperty for Color {
    fn to_change(
        value: &PropertyValue,
    ) -> std::result::Result<(String, StateChange), ValidationError> {
        let text = value.as_str().ok_or_else(|| mismatch::<Self>(value))?;
        let rgb = parse_hex_color(text).ok_or_else(|| ValidationError::InvalidFormat {
            property: Self::NAME.to_string(),
            reason: format!("{:?} is not a #RRGGBB color", text),
        })?;
        Ok((color_to_hex(Some(rgb)), StateChange::colors(rgb)))
    }
}

/// Color temperature in Kelvin
#[derive(Debug, Clone, Copy)]
pub struct ColorTemperature;

impl MirroredProperty for ColorTemperature {
    const NAME: &'static str = "colorTemperature";
    type Value = u32;

    fn description() -> PropertyDescription {
        PropertyDescription::new(
            Self::NAME,
            "ColorTemperatureProperty",
            "Color Temperature",
            ValueType::Integer,
        )
        .with_unit("kelvin")
        .with_range(i64::from(MIN_TEMPERATURE), i64::from(MAX_TEMPERATURE))
    }

    fn read(remote: &dyn RemoteDevice) -> u32 {
        relative_to_kelvin(remote.temperature())
    }
}

impl WritableProperty for ColorTemperature {
    fn to_change(
        value: &PropertyValue,
    ) -> std::result::Result<(u32, StateChange), ValidationError> {
        let kelvin = value
            .as_i64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| mismatch::<Self>(value))?;
        let relative = kelvin_to_relative(kelvin);
        // Cache what the bulb will report back, not the raw request
        Ok((relative_to_kelvin(relative), StateChange::temperature(relative)))
    }
}

/// Whether a color bulb is showing a color or a white temperature
///
/// Derived from [`Color`]: the `#000000` sentinel means "temperature". A bulb
/// that really is set to pure black cannot be told apart from one without a
/// color, which is a known limitation of the sentinel.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode;

impl ColorMode {
    pub const COLOR: &'static str = "color";
    pub const TEMPERATURE: &'static str = "temperature";

    /// Mode implied by a published color string
    pub fn from_color(color: &str) -> &'static str {
        if color == NO_COLOR {
            Self::TEMPERATURE
        } else {
            Self::COLOR
        }
    }
}

impl MirroredProperty for ColorMode {
    const NAME: &'static str = "colorMode";
    type Value = &'static str;

    fn description() -> PropertyDescription {
        PropertyDescription::new(Self::NAME, "ColorModeProperty", "Color Mode", ValueType::String)
            .with_allowed_values([Self::COLOR, Self::TEMPERATURE])
            .read_only()
    }

    fn read(remote: &dyn RemoteDevice) -> &'static str {
        Self::from_color(&Color::read(remote))
    }
}

fn mismatch<P: MirroredProperty>(value: &PropertyValue) -> ValidationError {
    ValidationError::TypeMismatch {
        property: P::NAME.to_string(),
        expected: P::description().value_type,
        found: value.value_type(),
    }
}

// ============================================================================
// PropertyMirror
// ============================================================================

/// Object-safe view of a property mirror, used to walk a device's
/// properties in declaration order
pub trait Mirror: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &PropertyDescription;

    /// Last published value
    fn published_value(&self) -> PropertyValue;

    /// Publish the cached value unconditionally (initial publish)
    fn publish(&self, registry: &dyn Registry) -> std::result::Result<bool, RegistryError>;

    /// Re-read the remote handle and publish on change
    fn refresh(
        &mut self,
        remote: &dyn RemoteDevice,
        registry: &dyn Registry,
    ) -> std::result::Result<bool, RegistryError>;
}

/// Synchronized mirror of one property of one device
pub struct PropertyMirror<P: MirroredProperty> {
    device_id: String,
    description: PropertyDescription,
    value: P::Value,
    _phantom: PhantomData<P>,
}

impl<P: MirroredProperty> PropertyMirror<P> {
    /// Create a mirror seeded from the remote handle's current fields
    pub fn new(device_id: impl Into<String>, remote: &dyn RemoteDevice) -> Self {
        Self {
            device_id: device_id.into(),
            description: P::description(),
            value: P::read(remote),
            _phantom: PhantomData,
        }
    }

    /// Cached value (what the registry was last told)
    pub fn value(&self) -> &P::Value {
        &self.value
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Read the live value from the remote handle, without side effects
    pub fn read_current_value(&self, remote: &dyn RemoteDevice) -> P::Value {
        P::read(remote)
    }

    /// Publish `current` if it differs from the cached value
    pub fn sync(
        &mut self,
        current: P::Value,
        registry: &dyn Registry,
    ) -> std::result::Result<bool, RegistryError> {
        if current == self.value {
            return Ok(false);
        }

        registry.publish_value(&self.device_id, P::NAME, current.clone().into())?;
        debug!(
            device_id = %self.device_id,
            property = P::NAME,
            old = ?self.value,
            new = ?current,
            "Property refreshed"
        );
        self.value = current;
        Ok(true)
    }
}

impl<P: WritableProperty> PropertyMirror<P> {
    /// Write a client value through to the device
    ///
    /// The value is validated against the description before the remote
    /// handle is touched. The cache and the registry are only updated once
    /// the device accepted the change.
    pub async fn apply_write(
        &mut self,
        remote: &mut dyn RemoteDevice,
        registry: &dyn Registry,
        value: &PropertyValue,
    ) -> Result<()> {
        self.description.validate(value)?;
        let (typed, change) = P::to_change(value)?;

        remote
            .set_state(change)
            .await
            .map_err(|source| DeviceError::Write {
                property: P::NAME.to_string(),
                source,
            })?;

        debug!(device_id = %self.device_id, property = P::NAME, value = ?typed, "Write applied");
        registry.publish_value(&self.device_id, P::NAME, typed.clone().into())?;
        self.value = typed;
        Ok(())
    }
}

impl<P: MirroredProperty> Mirror for PropertyMirror<P> {
    fn name(&self) -> &'static str {
        P::NAME
    }

    fn description(&self) -> &PropertyDescription {
        &self.description
    }

    fn published_value(&self) -> PropertyValue {
        self.value.clone().into()
    }

    fn publish(&self, registry: &dyn Registry) -> std::result::Result<bool, RegistryError> {
        registry.publish_value(&self.device_id, P::NAME, self.published_value())
    }

    fn refresh(
        &mut self,
        remote: &dyn RemoteDevice,
        registry: &dyn Registry,
    ) -> std::result::Result<bool, RegistryError> {
        self.sync(P::read(remote), registry)
    }
}

impl<P: MirroredProperty> fmt::Debug for PropertyMirror<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMirror")
            .field("device_id", &self.device_id)
            .field("name", &P::NAME)
            .field("value", &self.value)
            .finish()
    }
}
