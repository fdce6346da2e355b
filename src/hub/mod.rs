//! Home-automation hub access
//!
//! The bridge only talks to the hub through [`HubClient`]. The production
//! implementation is [`DomoticzClient`]; tests substitute an in-memory hub.

pub mod capabilities;
pub mod credentials;
mod domoticz;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::Result;

pub use capabilities::HubCapabilities;
pub use credentials::{HubAuth, HubEndpoint};
pub use domoticz::DomoticzClient;

static ALEXA_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)Alexa_Name:\s*(.+)").expect("valid regex"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?[0-9]+(?:\.[0-9]+)?").expect("valid regex"));

/// One device as reported by the hub's device listing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HubDevice {
    #[serde(rename = "idx", deserialize_with = "loose_string")]
    pub id: String,

    /// Coarse category, e.g. "Light/Switch", "Temp + Humidity", "Thermostat"
    #[serde(rename = "Type", default)]
    pub device_type: String,

    /// Fine-grained type, e.g. "SetPoint", "Percentage", "RGBWW"
    #[serde(rename = "SubType", default)]
    pub subtype: String,

    /// Switch behaviour, e.g. "Dimmer", "Selector", "Blinds Percentage"
    #[serde(rename = "SwitchType", default)]
    pub switch_type: Option<String>,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Description", default)]
    pub description: String,

    /// Room plan membership; "0" or empty means not in any plan
    #[serde(rename = "PlanID", default, deserialize_with = "loose_opt_string")]
    pub plan_id: Option<String>,

    /// Base64, pipe-delimited selector level names
    #[serde(rename = "LevelNames", default)]
    pub level_names: Option<String>,

    /// Free-text reading, e.g. "53.755 kg"
    #[serde(rename = "Data", default)]
    pub data: String,

    #[serde(rename = "Temp", default, deserialize_with = "loose_f64")]
    pub temp: Option<f64>,

    #[serde(rename = "SetPoint", default, deserialize_with = "loose_f64")]
    pub setpoint: Option<f64>,

    #[serde(rename = "Humidity", default, deserialize_with = "loose_f64")]
    pub humidity: Option<f64>,

    #[serde(rename = "Level", default, deserialize_with = "loose_f64")]
    pub level: Option<f64>,

    #[serde(rename = "MaxDimLevel", default, deserialize_with = "loose_f64")]
    pub max_dim_level: Option<f64>,

    /// "On", "Off", "Locked", "Set Level: 40 %", ...
    #[serde(rename = "Status", default)]
    pub status: String,

    #[serde(rename = "HardwareName", default)]
    pub hardware_name: Option<String>,
}

impl HubDevice {
    /// Whether the device belongs to a room plan and may be exposed
    #[must_use]
    pub fn in_plan(&self) -> bool {
        self.plan_id
            .as_deref()
            .is_some_and(|plan| !plan.is_empty() && plan != "0")
    }

    /// Spoken name: `Alexa_Name:` in the description overrides the hub name
    #[must_use]
    pub fn friendly_name(&self) -> String {
        ALEXA_NAME
            .captures(&self.description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.name.clone())
    }

    #[must_use]
    pub fn switch_type(&self) -> &str {
        self.switch_type.as_deref().unwrap_or_default()
    }

    /// First number in the free-text data field
    #[must_use]
    pub fn numeric_data(&self) -> Option<f64> {
        NUMBER
            .find(&self.data)
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Whether the status reads as switched on
    #[must_use]
    pub fn is_on(&self) -> bool {
        let status = self.status.trim();
        !status.is_empty()
            && !status.eq_ignore_ascii_case("off")
            && !status.eq_ignore_ascii_case("closed")
    }
}

/// Result of a device listing call
#[derive(Debug, Clone, Default)]
pub struct DeviceListing {
    pub devices: Vec<HubDevice>,

    /// Release string the hub reported alongside the listing, if any
    pub version: Option<String>,
}

/// Switch command understood by `switchlight`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
    Open,
    Close,
    Stop,
}

impl SwitchCommand {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Off => "Off",
            Self::Open => "Open",
            Self::Close => "Close",
            Self::Stop => "Stop",
        }
    }
}

/// Scene/group command understood by `switchscene`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    On,
    Off,
}

impl SceneCommand {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Off => "Off",
        }
    }
}

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Lowercase hex without a leading `#`
    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode([self.r, self.g, self.b])
    }
}

/// Operations the bridge needs from the hub
///
/// Every write resolves to `Ok(())` only when the hub acknowledged the
/// command; transport failures and non-OK statuses are errors.
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Fetch all used devices
    async fn list_devices(&self) -> Result<DeviceListing>;

    /// Fetch a single device by hub id
    async fn get_device(&self, id: &str) -> Result<HubDevice>;

    async fn write_switch(&self, id: &str, command: SwitchCommand) -> Result<()>;

    /// Set a raw dim level (0..=`MaxDimLevel`)
    async fn write_dim_level(&self, id: &str, level: u32) -> Result<()>;

    /// Set colour without touching brightness
    async fn write_color(&self, id: &str, color: Rgb) -> Result<()>;

    async fn write_kelvin(&self, id: &str, kelvin: u32) -> Result<()>;

    async fn write_scene(&self, id: &str, command: SceneCommand) -> Result<()>;

    async fn write_setpoint(&self, id: &str, value: f64) -> Result<()>;
}

fn loose_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn loose_opt_string<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn loose_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_deserialization() {
        let json = r#"{
            "idx": "27",
            "Type": "Light/Switch",
            "SubType": "Switch",
            "SwitchType": "Dimmer",
            "Name": "Kitchen Light",
            "Description": "",
            "PlanID": "2",
            "Data": "Set Level: 40 %",
            "Level": 40,
            "MaxDimLevel": 100,
            "Status": "Set Level: 40 %",
            "HardwareName": "Zwave"
        }"#;

        let device: HubDevice = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, "27");
        assert_eq!(device.switch_type(), "Dimmer");
        assert!(device.in_plan());
        assert_eq!(device.level, Some(40.0));
        assert_eq!(device.max_dim_level, Some(100.0));
        assert!(device.is_on());
    }

    #[test]
    fn test_loose_numbers() {
        let json = r#"{ "idx": 12, "SetPoint": "20.5", "Temp": 19.25, "PlanID": 0 }"#;
        let device: HubDevice = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, "12");
        assert_eq!(device.setpoint, Some(20.5));
        assert_eq!(device.temp, Some(19.25));
        assert!(!device.in_plan());
    }

    #[test]
    fn test_plan_membership() {
        let mut device = HubDevice::default();
        assert!(!device.in_plan());
        device.plan_id = Some(String::new());
        assert!(!device.in_plan());
        device.plan_id = Some("0".to_string());
        assert!(!device.in_plan());
        device.plan_id = Some("3".to_string());
        assert!(device.in_plan());
    }

    #[test]
    fn test_friendly_name_override() {
        let device = HubDevice {
            name: "Z-Wave Node 5".to_string(),
            description: "Installed 2021\nalexa_name:  Porch Light \n".to_string(),
            ..HubDevice::default()
        };
        assert_eq!(device.friendly_name(), "Porch Light");

        let plain = HubDevice {
            name: "Hall".to_string(),
            ..HubDevice::default()
        };
        assert_eq!(plain.friendly_name(), "Hall");
    }

    #[test]
    fn test_numeric_data() {
        let weight = HubDevice {
            data: "53.755 kg".to_string(),
            ..HubDevice::default()
        };
        assert_eq!(weight.numeric_data(), Some(53.755));

        let ph = HubDevice {
            data: "8.1 pH".to_string(),
            ..HubDevice::default()
        };
        assert_eq!(ph.numeric_data(), Some(8.1));

        let empty = HubDevice::default();
        assert_eq!(empty.numeric_data(), None);
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb { r: 255, g: 128, b: 0 }.to_hex(), "ff8000");
    }
}
