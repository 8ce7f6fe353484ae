//! Capability classification from vendor model identifiers
//!
//! Eufy devices identify themselves by a model code. The code decides both
//! the device class (plug vs. bulb) and, for bulbs, which lighting features
//! exist. The result is folded into a closed [`DeviceVariant`] so the rest of
//! the crate never asks "does this field exist" at runtime.

use serde::{Deserialize, Serialize};

/// Bulb models
pub const BULB_MODELS: &[&str] = &["T1011", "T1012", "T1013"];

/// Plug and switch models
pub const SWITCH_MODELS: &[&str] = &["T1201", "T1202", "T1203", "T1211"];

/// Full color bulb model
pub const COLOR_MODEL: &str = "T1013";

/// Models with tunable white
pub const VARIABLE_TEMPERATURE_MODELS: &[&str] = &["T1012", "T1013"];

/// Device class, decided before bulb capabilities are looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Switch,
    Bulb,
}

impl DeviceClass {
    /// Class of a model identifier; unknown models are treated as switches
    pub fn from_model(model: &str) -> Self {
        if BULB_MODELS.contains(&model) {
            DeviceClass::Bulb
        } else {
            DeviceClass::Switch
        }
    }

    pub fn is_known_model(model: &str) -> bool {
        BULB_MODELS.contains(&model) || SWITCH_MODELS.contains(&model)
    }
}

/// Lighting features of a bulb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulbCapabilities {
    pub supports_color: bool,
    pub supports_variable_temperature: bool,
}

impl BulbCapabilities {
    pub fn from_model(model: &str) -> Self {
        Self {
            supports_color: model == COLOR_MODEL,
            supports_variable_temperature: VARIABLE_TEMPERATURE_MODELS.contains(&model),
        }
    }

    /// Whether a derived color-mode property is exposed
    pub fn has_color_mode(&self) -> bool {
        self.supports_color && self.supports_variable_temperature
    }
}

/// The four property shapes a device can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceVariant {
    /// on
    Switch,
    /// on, level
    PlainBulb,
    /// on, level, colorTemperature
    TunableBulb,
    /// on, level, color, colorTemperature, colorMode
    ColorBulb,
}

impl DeviceVariant {
    pub fn classify(class: DeviceClass, model: &str) -> Self {
        match class {
            DeviceClass::Switch => DeviceVariant::Switch,
            DeviceClass::Bulb => {
                let caps = BulbCapabilities::from_model(model);
                if caps.has_color_mode() {
                    DeviceVariant::ColorBulb
                } else if caps.supports_variable_temperature {
                    DeviceVariant::TunableBulb
                } else {
                    DeviceVariant::PlainBulb
                }
            }
        }
    }

    pub fn class(&self) -> DeviceClass {
        match self {
            DeviceVariant::Switch => DeviceClass::Switch,
            _ => DeviceClass::Bulb,
        }
    }

    /// Property names in declaration order
    pub fn property_names(&self) -> &'static [&'static str] {
        match self {
            DeviceVariant::Switch => &["on"],
            DeviceVariant::PlainBulb => &["on", "level"],
            DeviceVariant::TunableBulb => &["on", "level", "colorTemperature"],
            DeviceVariant::ColorBulb => &["on", "level", "color", "colorTemperature", "colorMode"],
        }
    }

    /// Semantic capability tags published with the device
    pub fn capabilities(&self) -> Vec<String> {
        let tags: &[&str] = match self {
            DeviceVariant::Switch => &["OnOffSwitch", "SmartPlug"],
            DeviceVariant::PlainBulb => &["OnOffSwitch", "Light"],
            DeviceVariant::TunableBulb | DeviceVariant::ColorBulb => {
                &["OnOffSwitch", "Light", "ColorControl"]
            }
        };
        tags.iter().map(|t| t.to_string()).collect()
    }
}
