//! The adapter: composition root for all mirrored devices
//!
//! The adapter brings devices up, publishes them to the registry, hands them
//! to the polling scheduler, and routes client writes to the right mirror.
//!
//! ```rust,ignore
//! let registry = GatewayRegistry::new();
//! let adapter = Adapter::new(Arc::new(registry.clone()), PollingConfig::default());
//!
//! adapter.add_device(DeviceConfig::new("eufy-1", "Desk Lamp"), Box::new(remote)).await?;
//! adapter.set_property("eufy-1", "on", PropertyValue::Boolean(true)).await?;
//!
//! adapter.shutdown().await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use eufy_registry::{PropertyValue, Registry};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::config::{DeviceConfig, PollingConfig};
use crate::error::{AdapterError, PollingError};
use crate::mirror::DeviceMirror;
use crate::polling::PollingScheduler;
use crate::remote::RemoteDevice;

pub struct Adapter {
    registry: Arc<dyn Registry>,
    scheduler: PollingScheduler,
    devices: RwLock<HashMap<String, Arc<DeviceMirror>>>,
    // Serializes add_device so the limit check and the insert cannot interleave
    adding: Mutex<()>,
}

impl Adapter {
    pub fn new(registry: Arc<dyn Registry>, config: PollingConfig) -> Self {
        Self {
            registry,
            scheduler: PollingScheduler::new(config),
            devices: RwLock::new(HashMap::new()),
            adding: Mutex::new(()),
        }
    }

    /// Initialize a device, publish it, and start polling it
    ///
    /// If initialization fails nothing is published and the device is not
    /// added. Concurrent calls are handled one at a time.
    pub async fn add_device(
        &self,
        config: DeviceConfig,
        remote: Box<dyn RemoteDevice>,
    ) -> Result<Arc<DeviceMirror>, AdapterError> {
        let _adding = self.adding.lock().await;
        {
            let devices = self.devices.read().await;
            if devices.contains_key(&config.id) {
                return Err(AdapterError::DuplicateDevice(config.id));
            }
            // Checked before init so a device that cannot be polled is never published
            let limit = self.scheduler.config().max_devices;
            if devices.len() >= limit {
                return Err(PollingError::TooManyDevices { limit }.into());
            }
        }

        let mirror = DeviceMirror::initialize(
            config.id.clone(),
            config.name,
            config.class,
            remote,
            Arc::clone(&self.registry),
        )
        .await?;
        let mirror = Arc::new(mirror);

        self.scheduler.start_polling(Arc::clone(&mirror)).await?;
        self.devices
            .write()
            .await
            .insert(config.id.clone(), Arc::clone(&mirror));

        info!(device_id = %config.id, "Device added");
        Ok(mirror)
    }

    pub async fn device(&self, device_id: &str) -> Option<Arc<DeviceMirror>> {
        self.devices.read().await.get(device_id).cloned()
    }

    pub async fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Write a property value through to a device
    pub async fn set_property(
        &self,
        device_id: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<(), AdapterError> {
        let mirror = self
            .device(device_id)
            .await
            .ok_or_else(|| AdapterError::DeviceNotFound(device_id.to_string()))?;

        mirror.apply_write(property, value).await?;
        Ok(())
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    /// Stop every polling task
    ///
    /// Device mirrors stay readable afterwards but are no longer refreshed.
    pub async fn shutdown(&self) -> Result<(), AdapterError> {
        info!("Shutting down adapter");
        self.scheduler.shutdown_all().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
