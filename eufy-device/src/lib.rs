//! Eufy Device Synchronization
//!
//! Keeps an in-process mirror of Eufy smart plugs and bulbs in sync with the
//! physical devices, and exposes each device to a gateway [`Registry`] as a
//! uniform set of properties.
//!
//! # Features
//!
//! - **Capability Shapes**: the model identifier picks one of four property
//!   sets (switch, plain bulb, tunable white bulb, color bulb)
//! - **Polling**: one background task per device refreshes state on a fixed
//!   interval and only re-publishes changed values
//! - **Recovery**: a broken connection is re-established once per cycle;
//!   other failures skip the cycle and keep the last-known values
//! - **Write-through**: client writes are validated, pushed to the device,
//!   then published
//!
//! # Architecture
//!
//! ```text
//! Adapter
//!     │
//!     ├── DeviceMirror (one per device)
//!     │       ├── Box<dyn RemoteDevice>
//!     │       └── DeviceProperties
//!     │               └── PropertyMirror<On | Level | Color | ...>
//!     │
//!     ├── PollingScheduler
//!     │       └── PollingTask (tokio task, watch shutdown)
//!     │
//!     └── Arc<dyn Registry>
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use eufy_device::{Adapter, DeviceConfig, PollingConfig};
//! use eufy_registry::GatewayRegistry;
//!
//! let registry = GatewayRegistry::new();
//! let adapter = Adapter::new(Arc::new(registry.clone()), PollingConfig::default());
//! adapter.add_device(DeviceConfig::new("eufy-1", "Desk Lamp"), Box::new(remote)).await?;
//!
//! for event in registry.iter() {
//!     println!("{}.{} = {}", event.device_id, event.property, event.value);
//! }
//! ```
//!
//! [`Registry`]: eufy_registry::Registry

pub mod adapter;
pub mod capability;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod polling;
pub mod property;
pub mod remote;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use adapter::Adapter;
pub use capability::{BulbCapabilities, DeviceClass, DeviceVariant};
pub use config::{DeviceConfig, PollingConfig};
pub use error::{
    AdapterError, ConfigError, DeviceError, InitStage, PollingError, Result, TransportError,
};
pub use mirror::{DeviceMirror, DeviceProperties, MirrorState, PollOutcome};
pub use polling::{PollingScheduler, PollingSchedulerStats, PollingTask, PollingTaskStats};
pub use property::{
    Color, ColorMode, ColorTemperature, Level, Mirror, MirroredProperty, On, PropertyMirror,
    WritableProperty,
};
pub use remote::{RemoteDevice, Rgb, StateChange};
