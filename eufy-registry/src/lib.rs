//! Gateway Device Registry
//!
//! The gateway-side half of the Eufy bridge: the place devices publish their
//! descriptions and property values to.
//!
//! # Features
//!
//! - **Gateway JSON shape**: device and property descriptions serialize to
//!   the `@type`/`title`/`type`/`unit`/`minimum`/`maximum`/`enum`/`readOnly`
//!   layout the gateway expects
//! - **Change Detection**: a value is only re-published when it differs
//! - **Blocking Iteration**: consume change events via blocking iterators
//! - **Validation**: check client writes against a property's description
//!
//! # Quick Start
//!
//! ```rust
//! use eufy_registry::{
//!     DeviceDescription, GatewayRegistry, PropertyDescription, PropertyValue, Registry, ValueType,
//! };
//!
//! let registry = GatewayRegistry::new();
//!
//! registry
//!     .publish_device(DeviceDescription {
//!         id: "eufy-1".to_string(),
//!         title: "Kitchen Plug".to_string(),
//!         capabilities: vec!["OnOffSwitch".to_string(), "SmartPlug".to_string()],
//!         description: "T1201".to_string(),
//!         properties: vec![PropertyDescription::new(
//!             "on",
//!             "OnOffProperty",
//!             "On/Off",
//!             ValueType::Boolean,
//!         )],
//!     })
//!     .unwrap();
//!
//! let changed = registry
//!     .publish_value("eufy-1", "on", PropertyValue::Boolean(true))
//!     .unwrap();
//! assert!(changed);
//!
//! let event = registry.iter().try_recv().unwrap();
//! assert_eq!(event.property, "on");
//! ```
//!
//! # Architecture
//!
//! ```text
//! GatewayRegistry
//!     │
//!     ├── devices: HashMap<device_id, DeviceEntry>
//!     │       │
//!     │       ├── description: DeviceDescription
//!     │       └── values: HashMap<property, PropertyValue>
//!     │
//!     └── event_channel: mpsc::channel<ChangeEvent>
//!             │
//!             └── ChangeIterator
//! ```

pub mod description;
pub mod error;
pub mod event;
pub mod iter;
pub mod store;
pub mod value;

pub use description::{DeviceDescription, PropertyDescription};
pub use error::{RegistryError, Result, ValidationError};
pub use event::ChangeEvent;
pub use iter::{ChangeIterator, TimeoutIter, TryIter};
pub use store::{GatewayRegistry, Registry};
pub use value::{PropertyValue, ValueType};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::description::{DeviceDescription, PropertyDescription};
    pub use crate::event::ChangeEvent;
    pub use crate::store::{GatewayRegistry, Registry};
    pub use crate::value::{PropertyValue, ValueType};
}
