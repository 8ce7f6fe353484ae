//! The registry seam and its in-memory implementation
//!
//! - `Registry`: what a device adapter needs from the gateway (publish a
//!   device description, publish property values)
//! - `GatewayRegistry`: thread-safe in-memory registry with change detection
//!   and a blocking change-event iterator

use std::collections::HashMap;
use std::sync::{mpsc, Arc};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::description::DeviceDescription;
use crate::error::{RegistryError, Result};
use crate::event::ChangeEvent;
use crate::iter::ChangeIterator;
use crate::value::PropertyValue;

/// Gateway-side sink for device descriptions and property values
///
/// Implementations must be cheap to call from polling tasks; they are called
/// once per changed property per poll cycle.
pub trait Registry: Send + Sync {
    /// Register a device and its property descriptions
    fn publish_device(&self, description: DeviceDescription) -> Result<()>;

    /// Publish the current value of one property
    ///
    /// Returns `true` if the value differs from the previously published one
    /// (or is the first value), in which case a change notification is sent.
    fn publish_value(&self, device_id: &str, property: &str, value: PropertyValue) -> Result<bool>;
}

impl<R: Registry + ?Sized> Registry for Arc<R> {
    fn publish_device(&self, description: DeviceDescription) -> Result<()> {
        (**self).publish_device(description)
    }

    fn publish_value(&self, device_id: &str, property: &str, value: PropertyValue) -> Result<bool> {
        (**self).publish_value(device_id, property, value)
    }
}

/// One published device and its latest values
#[derive(Debug)]
struct DeviceEntry {
    description: DeviceDescription,
    values: HashMap<String, PropertyValue>,
}

impl DeviceEntry {
    fn new(description: DeviceDescription) -> Self {
        Self {
            description,
            values: HashMap::new(),
        }
    }

    /// Store a value, returning whether it changed
    fn set(&mut self, property: &str, value: PropertyValue) -> bool {
        if self.values.get(property) == Some(&value) {
            return false;
        }
        self.values.insert(property.to_string(), value);
        true
    }
}

/// In-memory gateway registry
///
/// Clones share the same devices and the same event queue.
///
/// # Example
///
/// ```rust,ignore
/// use eufy_registry::{GatewayRegistry, PropertyValue, Registry};
///
/// let registry = GatewayRegistry::new();
/// registry.publish_device(description)?;
/// registry.publish_value("eufy-1", "on", PropertyValue::Boolean(true))?;
///
/// assert_eq!(registry.get("eufy-1", "on"), Some(PropertyValue::Boolean(true)));
/// ```
pub struct GatewayRegistry {
    devices: Arc<RwLock<HashMap<String, DeviceEntry>>>,
    event_tx: mpsc::Sender<ChangeEvent>,
    event_rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel();

        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    /// Latest published value of a property
    pub fn get(&self, device_id: &str, property: &str) -> Option<PropertyValue> {
        self.devices
            .read()
            .get(device_id)?
            .values
            .get(property)
            .cloned()
    }

    /// All published values of a device, in declaration order
    pub fn values(&self, device_id: &str) -> Vec<(String, PropertyValue)> {
        let devices = self.devices.read();
        let Some(entry) = devices.get(device_id) else {
            return Vec::new();
        };

        entry
            .description
            .properties
            .iter()
            .filter_map(|p| {
                entry
                    .values
                    .get(&p.name)
                    .map(|v| (p.name.clone(), v.clone()))
            })
            .collect()
    }

    /// Description of a published device
    pub fn device(&self, device_id: &str) -> Option<DeviceDescription> {
        self.devices
            .read()
            .get(device_id)
            .map(|entry| entry.description.clone())
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.devices.read().keys().cloned().collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.device_count() == 0
    }

    /// Remove a device and its values
    pub fn remove_device(&self, device_id: &str) -> bool {
        self.devices.write().remove(device_id).is_some()
    }

    /// Blocking iterator over change events
    pub fn iter(&self) -> ChangeIterator {
        ChangeIterator::new(Arc::clone(&self.event_rx))
    }
}

impl Registry for GatewayRegistry {
    fn publish_device(&self, description: DeviceDescription) -> Result<()> {
        let mut devices = self.devices.write();
        if devices.contains_key(&description.id) {
            return Err(RegistryError::DuplicateDevice(description.id));
        }

        info!(
            device_id = %description.id,
            title = %description.title,
            properties = ?description.property_names(),
            "Device published"
        );
        devices.insert(description.id.clone(), DeviceEntry::new(description));
        Ok(())
    }

    fn publish_value(&self, device_id: &str, property: &str, value: PropertyValue) -> Result<bool> {
        let changed = {
            let mut devices = self.devices.write();
            let entry = devices
                .get_mut(device_id)
                .ok_or_else(|| RegistryError::UnknownDevice(device_id.to_string()))?;

            if entry.description.property(property).is_none() {
                return Err(RegistryError::UnknownProperty {
                    device_id: device_id.to_string(),
                    property: property.to_string(),
                });
            }

            entry.set(property, value.clone())
        };

        if changed {
            debug!(device_id, property, %value, "Property changed");
            let _ = self
                .event_tx
                .send(ChangeEvent::new(device_id, property, value));
        }

        Ok(changed)
    }
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GatewayRegistry {
    fn clone(&self) -> Self {
        Self {
            devices: Arc::clone(&self.devices),
            event_tx: self.event_tx.clone(),
            event_rx: Arc::clone(&self.event_rx),
        }
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("device_count", &self.device_count())
            .finish()
    }
}
