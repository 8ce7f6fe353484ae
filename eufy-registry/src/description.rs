//! Device and property descriptions
//!
//! Descriptions are the metadata half of what a device publishes to the
//! gateway: a semantic type, a human title, the declared value type, and the
//! optional constraints (unit, range, enum, read-only). They serialize to the
//! JSON shape the gateway consumes:
//!
//! ```json
//! {
//!   "name": "level",
//!   "@type": "BrightnessProperty",
//!   "title": "Brightness",
//!   "type": "integer",
//!   "unit": "percent",
//!   "minimum": 0,
//!   "maximum": 100
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::{PropertyValue, ValueType};

/// Metadata for one property of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescription {
    /// Property name, unique within its device
    pub name: String,

    /// Semantic type tag (e.g. `OnOffProperty`)
    #[serde(rename = "@type")]
    pub semantic_type: String,

    /// Human readable title
    pub title: String,

    /// Declared value type
    #[serde(rename = "type")]
    pub value_type: ValueType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,

    /// Allowed values for string properties
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

impl PropertyDescription {
    pub fn new(
        name: impl Into<String>,
        semantic_type: impl Into<String>,
        title: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            semantic_type: semantic_type.into(),
            title: title.into(),
            value_type,
            unit: None,
            minimum: None,
            maximum: None,
            allowed_values: None,
            read_only: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_range(mut self, minimum: i64, maximum: i64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = Some(true);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }

    /// Check a value written by a client against this description
    ///
    /// Read-only properties reject every write. Otherwise the value must have
    /// the declared type, integers must lie within `minimum..=maximum`, and
    /// strings must be one of the allowed values when an enum is declared.
    pub fn validate(&self, value: &PropertyValue) -> Result<(), ValidationError> {
        if self.is_read_only() {
            return Err(ValidationError::ReadOnly {
                property: self.name.clone(),
            });
        }

        if value.value_type() != self.value_type {
            return Err(ValidationError::TypeMismatch {
                property: self.name.clone(),
                expected: self.value_type,
                found: value.value_type(),
            });
        }

        match value {
            PropertyValue::Integer(v) => {
                let below = self.minimum.is_some_and(|min| *v < min);
                let above = self.maximum.is_some_and(|max| *v > max);
                if below || above {
                    return Err(ValidationError::OutOfRange {
                        property: self.name.clone(),
                        value: *v,
                        minimum: self.minimum,
                        maximum: self.maximum,
                    });
                }
            }
            PropertyValue::String(s) => {
                if let Some(allowed) = &self.allowed_values {
                    if !allowed.iter().any(|a| a == s) {
                        return Err(ValidationError::NotInEnum {
                            property: self.name.clone(),
                            value: s.clone(),
                        });
                    }
                }
            }
            PropertyValue::Boolean(_) => {}
        }

        Ok(())
    }
}

/// Metadata for a whole device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// Adapter-scoped device id
    pub id: String,

    pub title: String,

    /// Semantic capabilities (e.g. `OnOffSwitch`, `Light`)
    #[serde(rename = "@type")]
    pub capabilities: Vec<String>,

    /// Free-form description, the vendor model identifier for Eufy devices
    pub description: String,

    /// Property descriptions in declaration order
    pub properties: Vec<PropertyDescription>,
}

impl DeviceDescription {
    /// Look up a property description by name
    pub fn property(&self, name: &str) -> Option<&PropertyDescription> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Property names in declaration order
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }
}
