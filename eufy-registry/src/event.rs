//! Change events for published property values
//!
//! Whenever a published value differs from the one the registry already
//! holds, a `ChangeEvent` is emitted carrying the device, the property name
//! and the new value.

use std::time::Instant;

use crate::value::PropertyValue;

/// A change event emitted when a published property value changes
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// The device whose property changed
    pub device_id: String,

    /// The property name that changed
    pub property: String,

    /// The newly published value
    pub value: PropertyValue,

    /// When the change was detected
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Create a new change event
    pub fn new(
        device_id: impl Into<String>,
        property: impl Into<String>,
        value: PropertyValue,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            property: property.into(),
            value,
            timestamp: Instant::now(),
        }
    }
}

impl PartialEq for ChangeEvent {
    fn eq(&self, other: &Self) -> bool {
        // Timestamp not included in equality
        self.device_id == other.device_id
            && self.property == other.property
            && self.value == other.value
    }
}
