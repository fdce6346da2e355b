//! Per-endpoint context handed out at discovery and echoed back on every directive
//!
//! The cookie is the only thing the dispatcher knows about a device, so each
//! variant carries exactly what its dispatch branch needs.

use serde::{Deserialize, Serialize};

/// Endpoint id prefix for scenes and groups
pub const SCENE_PREFIX: &str = "scene_";

/// Endpoint id prefix for selector switches exposed as mode controllers
pub const SELECTOR_PREFIX: &str = "selector_";

/// Device semantics recorded at discovery time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DeviceCookie {
    /// On/off light or switch
    Switch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        switch_subtype: Option<String>,
    },
    /// Light with a dim level
    Dimmable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        switch_subtype: Option<String>,
        max_level: u32,
    },
    /// Scene (activate only) or group (on/off)
    Scene { scene_id: String, group: bool },
    Lock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        switch_subtype: Option<String>,
    },
    /// Setpoint device, or a temperature sensor paired with one
    Thermostat {
        /// Separate sensor supplying the current temperature
        #[serde(default, skip_serializing_if = "Option::is_none")]
        linked_temperature_device_id: Option<String>,
        /// Separate device holding the setpoint (endpoint is the sensor)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        linked_setpoint_device_id: Option<String>,
        /// Endpoint device reports a temperature of its own
        #[serde(default)]
        has_temperature: bool,
        /// Endpoint device also reports humidity
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        has_humidity: bool,
    },
    /// Plain temperature sensor without a setpoint
    Temperature,
    Humidity {
        #[serde(default)]
        with_temperature: bool,
    },
    Blind {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        switch_subtype: Option<String>,
        #[serde(default)]
        position_retrievable: bool,
    },
    /// Selector switch exposed as a mode controller
    Selector { instance: String, modes: Vec<String> },
    Weight,
    GeneralSensor { sensor_unit: SensorUnit },
}

/// Reading carried by a general-purpose sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorUnit {
    #[serde(rename = "percentage")]
    Percentage,
    #[serde(rename = "pH")]
    Ph,
    #[serde(rename = "g/m³")]
    AbsoluteHumidity,
}

impl SensorUnit {
    /// Range controller instance for non-percentage sensors
    #[must_use]
    pub const fn range_instance(self) -> Option<&'static str> {
        match self {
            Self::Percentage => None,
            Self::Ph => Some("Sensor.pH"),
            Self::AbsoluteHumidity => Some("Sensor.AbsoluteHumidity"),
        }
    }
}

impl DeviceCookie {
    /// Short name for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Switch { .. } => "switch",
            Self::Dimmable { .. } => "dimmable",
            Self::Scene { .. } => "scene",
            Self::Lock { .. } => "lock",
            Self::Thermostat { .. } => "thermostat",
            Self::Temperature => "temperature",
            Self::Humidity { .. } => "humidity",
            Self::Blind { .. } => "blind",
            Self::Selector { .. } => "selector",
            Self::Weight => "weight",
            Self::GeneralSensor { .. } => "generalSensor",
        }
    }

    /// Hub id a write for this endpoint should target
    #[must_use]
    pub fn target_id<'a>(&'a self, endpoint_id: &'a str) -> &'a str {
        match self {
            Self::Scene { scene_id, .. } => scene_id.as_str(),
            _ => hub_id(endpoint_id),
        }
    }

    /// Hub id holding the thermostat setpoint
    #[must_use]
    pub fn setpoint_id<'a>(&'a self, endpoint_id: &'a str) -> &'a str {
        match self {
            Self::Thermostat {
                linked_setpoint_device_id: Some(id),
                ..
            } => id.as_str(),
            _ => hub_id(endpoint_id),
        }
    }

    /// Hub id supplying the current temperature, if any
    #[must_use]
    pub fn temperature_id<'a>(&'a self, endpoint_id: &'a str) -> Option<&'a str> {
        match self {
            Self::Thermostat {
                linked_temperature_device_id: Some(id),
                ..
            } => Some(id.as_str()),
            Self::Thermostat {
                has_temperature: true,
                ..
            }
            | Self::Temperature
            | Self::Humidity {
                with_temperature: true,
            } => Some(hub_id(endpoint_id)),
            _ => None,
        }
    }
}

/// Strip the category prefix from an endpoint id
#[must_use]
pub fn hub_id(endpoint_id: &str) -> &str {
    endpoint_id
        .strip_prefix(SCENE_PREFIX)
        .or_else(|| endpoint_id.strip_prefix(SELECTOR_PREFIX))
        .unwrap_or(endpoint_id)
}
