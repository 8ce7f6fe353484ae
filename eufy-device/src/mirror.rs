//! Device mirrors
//!
//! A `DeviceMirror` owns one remote handle and the property mirrors its
//! variant exposes. It knows how to bring the device up, publish it, run one
//! poll cycle, and route client writes. Scheduling lives in
//! [`crate::polling`].
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──connect──▶ Connecting ──update──▶ Ready ──poll──▶ Polling
//!                                                                 │   ▲
//!                                                      broken pipe│   │reconnected / skipped
//!                                                                 ▼   │
//!                                                             Reconnecting
//! ```
//!
//! Initialization failures are returned to the caller and nothing is
//! published. Failures during polling never escape: the cycle is skipped and
//! the last published values stay in place.

use std::fmt;
use std::sync::Arc;

use eufy_registry::{
    DeviceDescription, PropertyDescription, PropertyValue, Registry, RegistryError,
    ValidationError,
};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::capability::{DeviceClass, DeviceVariant};
use crate::error::{DeviceError, InitStage, Result, TransportError};
use crate::property::{
    Color, ColorMode, ColorTemperature, Level, Mirror, MirroredProperty, On, PropertyMirror,
};
use crate::remote::RemoteDevice;

/// Lifecycle state of a device mirror
///
/// `Uninitialized` and `Connecting` are the phases of
/// [`DeviceMirror::initialize`] before the mirror exists; they show up in
/// logs but [`DeviceMirror::state`] never reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    Uninitialized,
    Connecting,
    Ready,
    Polling,
    Reconnecting,
    Stopped,
}

/// Result of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// `update()` succeeded; `changed` properties were re-published
    Refreshed { changed: usize },
    /// The transport broke, a reconnect fixed it, and properties refreshed
    Recovered { changed: usize },
    /// The remote could not be refreshed; nothing was published
    Skipped { error: TransportError },
}

impl PollOutcome {
    pub fn changed(&self) -> usize {
        match self {
            PollOutcome::Refreshed { changed } | PollOutcome::Recovered { changed } => *changed,
            PollOutcome::Skipped { .. } => 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PollOutcome::Skipped { .. })
    }
}

// ============================================================================
// DeviceProperties
// ============================================================================

/// The property set of a device, one variant per capability shape
///
/// Each variant carries exactly the mirrors it exposes, in declaration order.
#[derive(Debug)]
pub enum DeviceProperties {
    Switch {
        on: PropertyMirror<On>,
    },
    PlainBulb {
        on: PropertyMirror<On>,
        level: PropertyMirror<Level>,
    },
    TunableBulb {
        on: PropertyMirror<On>,
        level: PropertyMirror<Level>,
        color_temperature: PropertyMirror<ColorTemperature>,
    },
    ColorBulb {
        on: PropertyMirror<On>,
        level: PropertyMirror<Level>,
        color: PropertyMirror<Color>,
        color_temperature: PropertyMirror<ColorTemperature>,
        color_mode: PropertyMirror<ColorMode>,
    },
}

impl DeviceProperties {
    /// Build the mirrors for `variant`, seeded from the remote's current fields
    pub fn build(device_id: &str, variant: DeviceVariant, remote: &dyn RemoteDevice) -> Self {
        match variant {
            DeviceVariant::Switch => DeviceProperties::Switch {
                on: PropertyMirror::new(device_id, remote),
            },
            DeviceVariant::PlainBulb => DeviceProperties::PlainBulb {
                on: PropertyMirror::new(device_id, remote),
                level: PropertyMirror::new(device_id, remote),
            },
            DeviceVariant::TunableBulb => DeviceProperties::TunableBulb {
                on: PropertyMirror::new(device_id, remote),
                level: PropertyMirror::new(device_id, remote),
                color_temperature: PropertyMirror::new(device_id, remote),
            },
            DeviceVariant::ColorBulb => DeviceProperties::ColorBulb {
                on: PropertyMirror::new(device_id, remote),
                level: PropertyMirror::new(device_id, remote),
                color: PropertyMirror::new(device_id, remote),
                color_temperature: PropertyMirror::new(device_id, remote),
                color_mode: PropertyMirror::new(device_id, remote),
            },
        }
    }

    pub fn variant(&self) -> DeviceVariant {
        match self {
            DeviceProperties::Switch { .. } => DeviceVariant::Switch,
            DeviceProperties::PlainBulb { .. } => DeviceVariant::PlainBulb,
            DeviceProperties::TunableBulb { .. } => DeviceVariant::TunableBulb,
            DeviceProperties::ColorBulb { .. } => DeviceVariant::ColorBulb,
        }
    }

    /// Mirrors in declaration order
    pub fn mirrors(&self) -> Vec<&dyn Mirror> {
        match self {
            DeviceProperties::Switch { on } => vec![on],
            DeviceProperties::PlainBulb { on, level } => vec![on, level],
            DeviceProperties::TunableBulb {
                on,
                level,
                color_temperature,
            } => vec![on, level, color_temperature],
            DeviceProperties::ColorBulb {
                on,
                level,
                color,
                color_temperature,
                color_mode,
            } => vec![on, level, color, color_temperature, color_mode],
        }
    }

    fn mirrors_mut(&mut self) -> Vec<&mut dyn Mirror> {
        match self {
            DeviceProperties::Switch { on } => vec![on],
            DeviceProperties::PlainBulb { on, level } => vec![on, level],
            DeviceProperties::TunableBulb {
                on,
                level,
                color_temperature,
            } => vec![on, level, color_temperature],
            DeviceProperties::ColorBulb {
                on,
                level,
                color,
                color_temperature,
                color_mode,
            } => vec![on, level, color, color_temperature, color_mode],
        }
    }

    pub fn descriptions(&self) -> Vec<PropertyDescription> {
        self.mirrors()
            .into_iter()
            .map(|m| m.description().clone())
            .collect()
    }

    /// Last published value of a property
    pub fn value(&self, name: &str) -> Option<PropertyValue> {
        self.mirrors()
            .into_iter()
            .find(|m| m.name() == name)
            .map(|m| m.published_value())
    }

    /// Publish every cached value
    pub fn publish_all(&self, registry: &dyn Registry) -> std::result::Result<(), RegistryError> {
        for mirror in self.mirrors() {
            mirror.publish(registry)?;
        }
        Ok(())
    }

    /// Refresh every mirror in declaration order, returning how many changed
    ///
    /// A registry failure on one property is logged and does not stop the
    /// others; that property retries on the next cycle.
    pub fn refresh_all(&mut self, remote: &dyn RemoteDevice, registry: &dyn Registry) -> usize {
        let mut changed = 0;
        for mirror in self.mirrors_mut() {
            match mirror.refresh(remote, registry) {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(property = mirror.name(), error = %e, "Failed to publish refreshed value")
                }
            }
        }
        changed
    }

    /// Route a client write to the matching writable mirror
    pub async fn apply_write(
        &mut self,
        name: &str,
        value: &PropertyValue,
        remote: &mut dyn RemoteDevice,
        registry: &dyn Registry,
    ) -> Result<()> {
        match (self, name) {
            (
                DeviceProperties::Switch { on }
                | DeviceProperties::PlainBulb { on, .. }
                | DeviceProperties::TunableBulb { on, .. }
                | DeviceProperties::ColorBulb { on, .. },
                On::NAME,
            ) => on.apply_write(remote, registry, value).await,
            (
                DeviceProperties::PlainBulb { level, .. }
                | DeviceProperties::TunableBulb { level, .. }
                | DeviceProperties::ColorBulb { level, .. },
                Level::NAME,
            ) => level.apply_write(remote, registry, value).await,
            (
                DeviceProperties::TunableBulb {
                    color_temperature, ..
                }
                | DeviceProperties::ColorBulb {
                    color_temperature, ..
                },
                ColorTemperature::NAME,
            ) => color_temperature.apply_write(remote, registry, value).await,
            (
                DeviceProperties::ColorBulb {
                    color, color_mode, ..
                },
                Color::NAME,
            ) => {
                color.apply_write(remote, registry, value).await?;
                // colorMode is derived from color; keep the pair consistent
                let mode = ColorMode::from_color(color.value());
                color_mode.sync(mode, registry)?;
                Ok(())
            }
            (DeviceProperties::ColorBulb { .. }, ColorMode::NAME) => {
                Err(ValidationError::ReadOnly {
                    property: name.to_string(),
                }
                .into())
            }
            _ => Err(DeviceError::UnknownProperty(name.to_string())),
        }
    }
}

// ============================================================================
// DeviceMirror
// ============================================================================

/// State guarded by the per-device lock
struct DeviceCore {
    remote: Box<dyn RemoteDevice>,
    properties: DeviceProperties,
}

/// In-process mirror of one physical device
///
/// Poll cycles and writes both take the per-device lock, so at most one
/// operation touches the remote handle at a time and properties never read a
/// handle mid-update.
pub struct DeviceMirror {
    id: String,
    title: String,
    model: String,
    variant: DeviceVariant,
    registry: Arc<dyn Registry>,
    core: Mutex<DeviceCore>,
    state: RwLock<MirrorState>,
}

impl DeviceMirror {
    /// Connect, read initial state, build the property set, and publish
    ///
    /// An empty `name` falls back to the model identifier. When `class` is
    /// `None` it is derived from the model.
    pub async fn initialize(
        id: impl Into<String>,
        name: impl Into<String>,
        class: Option<DeviceClass>,
        mut remote: Box<dyn RemoteDevice>,
        registry: Arc<dyn Registry>,
    ) -> Result<Self> {
        let id = id.into();
        let model = remote.model().to_string();
        let name = name.into();
        let title = if name.is_empty() { model.clone() } else { name };

        debug!(
            device_id = %id,
            model = %model,
            state = ?MirrorState::Uninitialized,
            "Initializing"
        );
        remote.connect().await.map_err(|source| DeviceError::Init {
            device_id: id.clone(),
            stage: InitStage::Connect,
            source,
        })?;
        debug!(device_id = %id, state = ?MirrorState::Connecting, "Connected, reading state");
        remote.update().await.map_err(|source| DeviceError::Init {
            device_id: id.clone(),
            stage: InitStage::Update,
            source,
        })?;

        let class = class.unwrap_or_else(|| DeviceClass::from_model(&model));
        let variant = DeviceVariant::classify(class, &model);
        let properties = DeviceProperties::build(&id, variant, remote.as_ref());

        registry.publish_device(DeviceDescription {
            id: id.clone(),
            title: title.clone(),
            capabilities: variant.capabilities(),
            description: model.clone(),
            properties: properties.descriptions(),
        })?;
        properties.publish_all(registry.as_ref())?;

        info!(device_id = %id, title = %title, model = %model, ?variant, "Device ready");

        Ok(Self {
            id,
            title,
            model,
            variant,
            registry,
            core: Mutex::new(DeviceCore { remote, properties }),
            state: RwLock::new(MirrorState::Ready),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    pub fn state(&self) -> MirrorState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: MirrorState) {
        *self.state.write() = state;
    }

    /// Power flag of the remote handle
    pub async fn is_on(&self) -> bool {
        self.core.lock().await.remote.power()
    }

    /// Last published value of a property
    pub async fn value(&self, property: &str) -> Option<PropertyValue> {
        self.core.lock().await.properties.value(property)
    }

    /// All published values in declaration order
    pub async fn values(&self) -> Vec<(&'static str, PropertyValue)> {
        self.core
            .lock()
            .await
            .properties
            .mirrors()
            .into_iter()
            .map(|m| (m.name(), m.published_value()))
            .collect()
    }

    /// Run one poll cycle
    ///
    /// `update()` runs first; only if it succeeds (directly or after one
    /// reconnect on a broken pipe) are the properties refreshed.
    pub async fn poll_once(&self) -> PollOutcome {
        let mut core = self.core.lock().await;
        let DeviceCore { remote, properties } = &mut *core;

        let recovered = match remote.update().await {
            Ok(()) => false,
            Err(e) if e.is_broken_pipe() => {
                warn!(device_id = %self.id, error = %e, "Connection broken, reconnecting");
                self.set_state(MirrorState::Reconnecting);

                if let Err(e) = Self::reconnect(remote.as_mut()).await {
                    warn!(device_id = %self.id, error = %e, "Reconnect failed, skipping cycle");
                    self.set_state(MirrorState::Polling);
                    return PollOutcome::Skipped { error: e };
                }
                true
            }
            Err(e) => {
                warn!(device_id = %self.id, error = %e, "Update failed, skipping cycle");
                self.set_state(MirrorState::Polling);
                return PollOutcome::Skipped { error: e };
            }
        };

        self.set_state(MirrorState::Polling);
        let changed = properties.refresh_all(remote.as_ref(), self.registry.as_ref());
        debug!(device_id = %self.id, changed, recovered, "Poll cycle complete");

        if recovered {
            info!(device_id = %self.id, "Connection recovered");
            PollOutcome::Recovered { changed }
        } else {
            PollOutcome::Refreshed { changed }
        }
    }

    async fn reconnect(remote: &mut dyn RemoteDevice) -> std::result::Result<(), TransportError> {
        remote.connect().await?;
        remote.update().await
    }

    /// Write a client value through to the device
    pub async fn apply_write(&self, property: &str, value: PropertyValue) -> Result<()> {
        let mut core = self.core.lock().await;
        let DeviceCore { remote, properties } = &mut *core;

        let result = properties
            .apply_write(property, &value, remote.as_mut(), self.registry.as_ref())
            .await;

        if let Err(e) = &result {
            warn!(device_id = %self.id, property, %value, error = %e, "Write rejected");
        }
        result
    }
}

impl fmt::Debug for DeviceMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceMirror")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("model", &self.model)
            .field("variant", &self.variant)
            .field("state", &self.state())
            .finish()
    }
}
