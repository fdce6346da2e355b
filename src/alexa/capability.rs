//! Capability interface declarations for discovery responses

use serde::Serialize;
use serde_json::{Value, json};

use super::ns;

/// Locales every friendly name is published in
const LOCALES: [&str; 2] = ["en-US", "en-GB"];

/// Display category shown in the companion app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayCategory {
    Light,
    Switch,
    SceneTrigger,
    InteriorBlind,
    Smartlock,
    TemperatureSensor,
    Thermostat,
    Other,
}

/// One declared interface on an endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub interface: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<CapabilityProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_resources: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantics: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_deactivation: Option<bool>,
}

/// Property block of a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProperties {
    pub supported: Vec<SupportedProperty>,
    pub proactively_reported: bool,
    pub retrievable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_controllable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedProperty {
    pub name: &'static str,
}

/// Parameters of a `RangeController` declaration
#[derive(Debug, Clone)]
pub struct RangeSpec {
    pub instance: String,
    /// Friendly-name resources (text or asset entries)
    pub friendly_names: Value,
    pub minimum: f64,
    pub maximum: f64,
    pub precision: f64,
    pub unit: Option<&'static str>,
    pub controllable: bool,
    pub retrievable: bool,
    pub semantics: Option<Value>,
}

/// A mode offered by a `ModeController`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDeclaration {
    /// Wire value, e.g. `Level.20`
    pub value: String,
    /// Spoken names; the first is the display name
    pub names: Vec<String>,
}

/// Text friendly names for every published locale
#[must_use]
pub fn text_names<S: AsRef<str>>(names: &[S]) -> Value {
    let entries: Vec<Value> = names
        .iter()
        .flat_map(|name| {
            LOCALES.iter().map(move |locale| {
                json!({
                    "@type": "text",
                    "value": { "text": name.as_ref(), "locale": locale }
                })
            })
        })
        .collect();
    Value::Array(entries)
}

/// Catalog asset friendly name (e.g. `Alexa.Setting.Opening`)
#[must_use]
pub fn asset_name(asset_id: &str) -> Value {
    json!([{ "@type": "asset", "value": { "assetId": asset_id } }])
}

impl Capability {
    /// Bare declaration of an interface
    #[must_use]
    pub const fn interface(interface: &'static str) -> Self {
        Self {
            kind: "AlexaInterface",
            interface,
            version: "3",
            instance: None,
            properties: None,
            capability_resources: None,
            configuration: None,
            semantics: None,
            supports_deactivation: None,
        }
    }

    /// Interface with retrievable, non-proactive properties
    #[must_use]
    pub fn with_properties(interface: &'static str, names: &[&'static str]) -> Self {
        Self {
            properties: Some(CapabilityProperties {
                supported: names.iter().map(|name| SupportedProperty { name }).collect(),
                proactively_reported: false,
                retrievable: true,
                non_controllable: None,
            }),
            ..Self::interface(interface)
        }
    }

    #[must_use]
    fn non_controllable(mut self) -> Self {
        if let Some(props) = self.properties.as_mut() {
            props.non_controllable = Some(true);
        }
        self
    }

    /// Base presence declaration, always the last entry of an endpoint
    #[must_use]
    pub const fn alexa() -> Self {
        Self::interface(ns::ALEXA)
    }

    #[must_use]
    pub fn endpoint_health() -> Self {
        Self::with_properties(ns::ENDPOINT_HEALTH, &["connectivity"])
    }

    #[must_use]
    pub fn power() -> Self {
        Self::with_properties(ns::POWER, &["powerState"])
    }

    #[must_use]
    pub fn brightness() -> Self {
        Self::with_properties(ns::BRIGHTNESS, &["brightness"])
    }

    #[must_use]
    pub fn color() -> Self {
        Self::with_properties(ns::COLOR, &["color"])
    }

    #[must_use]
    pub fn color_temperature() -> Self {
        Self::with_properties(ns::COLOR_TEMPERATURE, &["colorTemperatureInKelvin"])
    }

    #[must_use]
    pub fn lock() -> Self {
        Self::with_properties(ns::LOCK, &["lockState"])
    }

    #[must_use]
    pub fn temperature_sensor() -> Self {
        Self::with_properties(ns::TEMPERATURE_SENSOR, &["temperature"])
    }

    #[must_use]
    pub fn humidity_sensor() -> Self {
        Self::with_properties(ns::HUMIDITY_SENSOR, &["humidity"])
    }

    #[must_use]
    pub fn thermostat() -> Self {
        Self::with_properties(ns::THERMOSTAT, &["targetSetpoint"])
    }

    #[must_use]
    pub fn percentage_sensor() -> Self {
        Self::with_properties(ns::PERCENTAGE, &["percentage"]).non_controllable()
    }

    /// Scene trigger; groups use `power()` instead since they can be switched off
    #[must_use]
    pub fn scene(supports_deactivation: bool) -> Self {
        Self {
            supports_deactivation: Some(supports_deactivation),
            ..Self::interface(ns::SCENE)
        }
    }

    /// Mode controller with an unordered list of modes
    #[must_use]
    pub fn mode(instance: &str, display_name: &str, modes: &[ModeDeclaration]) -> Self {
        let supported_modes: Vec<Value> = modes
            .iter()
            .map(|mode| {
                json!({
                    "value": mode.value,
                    "modeResources": { "friendlyNames": text_names(&mode.names) }
                })
            })
            .collect();

        Self {
            instance: Some(instance.to_string()),
            capability_resources: Some(json!({ "friendlyNames": text_names(&[display_name]) })),
            configuration: Some(json!({
                "ordered": false,
                "supportedModes": supported_modes
            })),
            ..Self::with_properties(ns::MODE, &["mode"])
        }
    }

    /// Range controller
    #[must_use]
    pub fn range(spec: RangeSpec) -> Self {
        let mut configuration = json!({
            "supportedRange": {
                "minimumValue": spec.minimum,
                "maximumValue": spec.maximum,
                "precision": spec.precision
            }
        });
        if let Some(unit) = spec.unit {
            configuration["unitOfMeasure"] = json!(unit);
        }

        let mut capability = Self {
            instance: Some(spec.instance),
            capability_resources: Some(json!({ "friendlyNames": spec.friendly_names })),
            configuration: Some(configuration),
            semantics: spec.semantics,
            ..Self::with_properties(ns::RANGE, &["rangeValue"])
        };
        if let Some(props) = capability.properties.as_mut() {
            props.retrievable = spec.retrievable;
        }
        if spec.controllable {
            capability
        } else {
            capability.non_controllable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_serialization() {
        let value = serde_json::to_value(Capability::power()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "AlexaInterface",
                "interface": "Alexa.PowerController",
                "version": "3",
                "properties": {
                    "supported": [{ "name": "powerState" }],
                    "proactivelyReported": false,
                    "retrievable": true
                }
            })
        );
    }

    #[test]
    fn test_base_declaration_has_no_properties() {
        let value = serde_json::to_value(Capability::alexa()).unwrap();
        assert_eq!(
            value,
            json!({ "type": "AlexaInterface", "interface": "Alexa", "version": "3" })
        );
    }

    #[test]
    fn test_scene_declares_deactivation() {
        let value = serde_json::to_value(Capability::scene(false)).unwrap();
        assert_eq!(value["supportsDeactivation"], false);
        assert!(value.get("properties").is_none());
    }

    #[test]
    fn test_non_controllable_range() {
        let cap = Capability::range(RangeSpec {
            instance: "Weight.Weight".to_string(),
            friendly_names: text_names(&["Weight"]),
            minimum: 0.0,
            maximum: 100.0,
            precision: 0.01,
            unit: Some("Weight.Kilograms"),
            controllable: false,
            retrievable: true,
            semantics: None,
        });
        let value = serde_json::to_value(cap).unwrap();
        assert_eq!(value["instance"], "Weight.Weight");
        assert_eq!(value["properties"]["nonControllable"], true);
        assert_eq!(value["configuration"]["unitOfMeasure"], "Weight.Kilograms");
        assert_eq!(value["configuration"]["supportedRange"]["maximumValue"], 100.0);
    }

    #[test]
    fn test_mode_declaration() {
        let modes = vec![
            ModeDeclaration {
                value: "Level.0".to_string(),
                names: vec!["Off".to_string()],
            },
            ModeDeclaration {
                value: "Level.10".to_string(),
                names: vec!["TV".to_string()],
            },
        ];
        let value = serde_json::to_value(Capability::mode("Receiver.Mode", "Receiver", &modes)).unwrap();
        let supported = value["configuration"]["supportedModes"].as_array().unwrap();
        assert_eq!(supported.len(), 2);
        assert_eq!(supported[1]["value"], "Level.10");
        assert_eq!(
            supported[1]["modeResources"]["friendlyNames"].as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn test_display_category_wire_names() {
        assert_eq!(serde_json::to_value(DisplayCategory::SceneTrigger).unwrap(), "SCENE_TRIGGER");
        assert_eq!(serde_json::to_value(DisplayCategory::InteriorBlind).unwrap(), "INTERIOR_BLIND");
        assert_eq!(serde_json::to_value(DisplayCategory::Smartlock).unwrap(), "SMARTLOCK");
    }
}
