//! Device discovery
//!
//! Turns one hub device snapshot into the endpoint list announced to the
//! voice platform. Mapping is a pure function of the snapshot and the
//! negotiated hub capabilities; the only hub call is the listing itself.

pub mod pairing;
pub mod selector;

use serde::Serialize;
use serde_json::json;

use crate::alexa::capability::{RangeSpec, asset_name, text_names};
use crate::alexa::{
    Capability, Directive, DisplayCategory, ErrorKind, EventEnvelope, ResponseBuilder, ns,
};
use crate::cookie::{DeviceCookie, SCENE_PREFIX, SELECTOR_PREFIX, SensorUnit};
use crate::hub::{HubCapabilities, HubClient, HubDevice};

use pairing::Pairings;

/// Manufacturer reported for scenes and devices without hardware info
const DEFAULT_MANUFACTURER: &str = "Domoticz";

/// Range instance for blind lift position
pub const BLIND_INSTANCE: &str = "Blind.Lift";

/// Range instance for weight sensors
pub const WEIGHT_INSTANCE: &str = "Weight.Weight";

/// One endpoint announced at discovery
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub endpoint_id: String,
    pub manufacturer_name: String,
    pub friendly_name: String,
    pub description: String,
    pub display_categories: Vec<DisplayCategory>,
    pub capabilities: Vec<Capability>,
    pub cookie: DeviceCookie,
}

impl EndpointDescriptor {
    fn new(device: &HubDevice, category: DisplayCategory, cookie: DeviceCookie) -> Self {
        Self {
            endpoint_id: device.id.clone(),
            manufacturer_name: device
                .hardware_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_MANUFACTURER.to_string()),
            friendly_name: device.friendly_name(),
            description: device.device_type.clone(),
            display_categories: vec![category],
            capabilities: Vec::new(),
            cookie,
        }
    }

    fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Append the health and base declarations every endpoint ends with
    fn finish(mut self) -> Self {
        self.capabilities.push(Capability::endpoint_health());
        self.capabilities.push(Capability::alexa());
        self
    }

    /// Whether the endpoint declares an interface
    #[must_use]
    pub fn has_interface(&self, interface: &str) -> bool {
        self.capabilities.iter().any(|c| c.interface == interface)
    }

    /// Interfaces in declaration order
    #[must_use]
    pub fn interfaces(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.interface).collect()
    }
}

/// Maps hub devices to endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityMapper {
    capabilities: HubCapabilities,
}

impl CapabilityMapper {
    #[must_use]
    pub const fn new(capabilities: HubCapabilities) -> Self {
        Self { capabilities }
    }

    /// Map a device snapshot to endpoints, in input order
    ///
    /// Devices outside any room plan, setpoints folded into a paired sensor,
    /// and unsupported device types are left out.
    #[must_use]
    pub fn map(&self, devices: &[HubDevice]) -> Vec<EndpointDescriptor> {
        let pairings = Pairings::compute(devices);

        devices
            .iter()
            .filter(|device| device.in_plan() && !pairings.is_suppressed(&device.id))
            .filter_map(|device| {
                let endpoint = self.classify(device, devices, &pairings);
                if endpoint.is_none() {
                    tracing::debug!(
                        id = %device.id,
                        device_type = %device.device_type,
                        subtype = %device.subtype,
                        "skipping unsupported device"
                    );
                }
                endpoint
            })
            .map(EndpointDescriptor::finish)
            .collect()
    }

    fn classify(
        &self,
        device: &HubDevice,
        devices: &[HubDevice],
        pairings: &Pairings,
    ) -> Option<EndpointDescriptor> {
        let device_type = device.device_type.as_str();
        let switch_type = device.switch_type();

        if device_type.starts_with("Scene") || device_type.starts_with("Group") {
            return Some(scene(device));
        }
        if switch_type.starts_with("Door Lock") {
            return Some(lock(device));
        }
        if switch_type.contains("Blind") {
            return Some(self.blind(device));
        }
        if device_type.starts_with("Light") || device_type.starts_with("Color Switch") {
            return Some(light(device));
        }
        if device_type.starts_with("Blind") || device_type.starts_with("RFY") {
            return Some(self.blind(device));
        }
        if device_type.starts_with("Lock") || device_type.starts_with("Contact") {
            return Some(lock(device));
        }
        if device_type.starts_with("Temp + Humidity") {
            return Some(match pairings.setpoint_for(&device.id) {
                Some(setpoint_id) => paired_thermostat(device, setpoint_id, true),
                None => humidity(device, true),
            });
        }
        if device_type.starts_with("Humidity") {
            return Some(humidity(device, false));
        }
        if device_type == "Thermostat" {
            return Some(thermostat(device, devices));
        }
        if device_type.starts_with("Temp") {
            return Some(match pairings.setpoint_for(&device.id) {
                Some(setpoint_id) => paired_thermostat(device, setpoint_id, false),
                None => temperature(device),
            });
        }
        if device_type == "Weight" {
            return Some(weight(device));
        }
        if device_type == "General" {
            return general(device);
        }
        None
    }

    fn blind(&self, device: &HubDevice) -> EndpointDescriptor {
        let switch_type = device.switch_type();
        let position_retrievable = self.capabilities.blind_position_retrievable(switch_type);
        let stoppable = switch_type.contains("Stop")
            || switch_type.contains("Venetian")
            || device.device_type.starts_with("RFY");

        let mut capabilities = vec![Capability::range(RangeSpec {
            instance: BLIND_INSTANCE.to_string(),
            friendly_names: asset_name("Alexa.Setting.Opening"),
            minimum: 0.0,
            maximum: 100.0,
            precision: 1.0,
            unit: Some("Alexa.Unit.Percent"),
            controllable: true,
            retrievable: position_retrievable,
            semantics: Some(blind_semantics()),
        })];
        if stoppable {
            capabilities.push(Capability::power());
        }

        EndpointDescriptor::new(
            device,
            DisplayCategory::InteriorBlind,
            DeviceCookie::Blind {
                switch_subtype: device.switch_type.clone(),
                position_retrievable,
            },
        )
        .with_capabilities(capabilities)
    }
}

fn scene(device: &HubDevice) -> EndpointDescriptor {
    let group = device.device_type.starts_with("Group");
    let mut endpoint = EndpointDescriptor::new(
        device,
        if group {
            DisplayCategory::Switch
        } else {
            DisplayCategory::SceneTrigger
        },
        DeviceCookie::Scene {
            scene_id: device.id.clone(),
            group,
        },
    )
    .with_capabilities(vec![if group {
        Capability::power()
    } else {
        Capability::scene(false)
    }]);

    endpoint.endpoint_id = format!("{SCENE_PREFIX}{}", device.id);
    endpoint.manufacturer_name = DEFAULT_MANUFACTURER.to_string();
    endpoint
}

fn light(device: &HubDevice) -> EndpointDescriptor {
    if device.switch_type() == "Selector"
        && let Some(level_names) = device.level_names.as_deref().filter(|s| !s.is_empty())
    {
        return selector_endpoint(device, level_names);
    }

    let color = device.device_type.starts_with("Color Switch");
    let dimmable = color || device.switch_type() == "Dimmer";
    let white_channel = ["WW", "CW", "CCT", "RGBW"]
        .iter()
        .any(|marker| device.subtype.contains(marker));

    let mut capabilities = vec![Capability::power()];
    if dimmable {
        capabilities.push(Capability::brightness());
    }
    if color {
        capabilities.push(Capability::color());
        if white_channel {
            capabilities.push(Capability::color_temperature());
        }
    }

    let cookie = if dimmable {
        DeviceCookie::Dimmable {
            switch_subtype: device.switch_type.clone(),
            max_level: max_level(device),
        }
    } else {
        DeviceCookie::Switch {
            switch_subtype: device.switch_type.clone(),
        }
    };

    EndpointDescriptor::new(device, DisplayCategory::Light, cookie).with_capabilities(capabilities)
}

/// Hub dim range; 0 or missing means a plain percentage
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn max_level(device: &HubDevice) -> u32 {
    match device.max_dim_level {
        Some(level) if level >= 1.0 => level.round() as u32,
        _ => 100,
    }
}

fn selector_endpoint(device: &HubDevice, level_names: &str) -> EndpointDescriptor {
    let modes = selector::decode_level_names(level_names);
    let instance = selector::instance_name(&device.name);
    let capability = Capability::mode(
        &instance,
        &device.name,
        &selector::mode_declarations(&modes),
    );

    let mut endpoint = EndpointDescriptor::new(
        device,
        DisplayCategory::Other,
        DeviceCookie::Selector { instance, modes },
    )
    .with_capabilities(vec![capability]);
    endpoint.endpoint_id = format!("{SELECTOR_PREFIX}{}", device.id);
    endpoint
}

fn blind_semantics() -> serde_json::Value {
    let set = |action: &str, value: i32| {
        json!({
            "@type": "ActionsToDirective",
            "actions": [action],
            "directive": { "name": "SetRangeValue", "payload": { "rangeValue": value } }
        })
    };
    let adjust = |action: &str, delta: i32| {
        json!({
            "@type": "ActionsToDirective",
            "actions": [action],
            "directive": {
                "name": "AdjustRangeValue",
                "payload": { "rangeValueDelta": delta, "rangeValueDeltaDefault": false }
            }
        })
    };

    json!({
        "actionMappings": [
            set("Alexa.Actions.Close", 0),
            set("Alexa.Actions.Open", 100),
            adjust("Alexa.Actions.Lower", -10),
            adjust("Alexa.Actions.Raise", 10)
        ],
        "stateMappings": [
            { "@type": "StatesToValue", "states": ["Alexa.States.Closed"], "value": 0 },
            {
                "@type": "StatesToRange",
                "states": ["Alexa.States.Open"],
                "range": { "minimumValue": 1, "maximumValue": 100 }
            }
        ]
    })
}

fn lock(device: &HubDevice) -> EndpointDescriptor {
    EndpointDescriptor::new(
        device,
        DisplayCategory::Smartlock,
        DeviceCookie::Lock {
            switch_subtype: device.switch_type.clone(),
        },
    )
    .with_capabilities(vec![Capability::lock()])
}

fn humidity(device: &HubDevice, with_temperature: bool) -> EndpointDescriptor {
    let (category, capabilities) = if with_temperature {
        (
            DisplayCategory::TemperatureSensor,
            vec![Capability::temperature_sensor(), Capability::humidity_sensor()],
        )
    } else {
        (DisplayCategory::Other, vec![Capability::humidity_sensor()])
    };

    EndpointDescriptor::new(device, category, DeviceCookie::Humidity { with_temperature })
        .with_capabilities(capabilities)
}

/// Standalone setpoint device
fn thermostat(device: &HubDevice, devices: &[HubDevice]) -> EndpointDescriptor {
    let has_temperature = device.temp.is_some();
    let linked_temperature_device_id = if has_temperature {
        None
    } else {
        pairing::temperature_partner(device, devices).map(|sensor| sensor.id.clone())
    };

    let mut capabilities = vec![Capability::thermostat()];
    if has_temperature || linked_temperature_device_id.is_some() {
        capabilities.push(Capability::temperature_sensor());
    }

    EndpointDescriptor::new(
        device,
        DisplayCategory::Thermostat,
        DeviceCookie::Thermostat {
            linked_temperature_device_id,
            linked_setpoint_device_id: None,
            has_temperature,
            has_humidity: false,
        },
    )
    .with_capabilities(capabilities)
}

/// Temperature sensor standing in for the setpoint paired with it
fn paired_thermostat(
    device: &HubDevice,
    setpoint_id: &str,
    has_humidity: bool,
) -> EndpointDescriptor {
    let mut capabilities = vec![Capability::thermostat(), Capability::temperature_sensor()];
    if has_humidity {
        capabilities.push(Capability::humidity_sensor());
    }

    EndpointDescriptor::new(
        device,
        DisplayCategory::Thermostat,
        DeviceCookie::Thermostat {
            linked_temperature_device_id: None,
            linked_setpoint_device_id: Some(setpoint_id.to_string()),
            has_temperature: true,
            has_humidity,
        },
    )
    .with_capabilities(capabilities)
}

fn temperature(device: &HubDevice) -> EndpointDescriptor {
    EndpointDescriptor::new(
        device,
        DisplayCategory::TemperatureSensor,
        DeviceCookie::Temperature,
    )
    .with_capabilities(vec![Capability::temperature_sensor()])
}

fn weight(device: &HubDevice) -> EndpointDescriptor {
    EndpointDescriptor::new(device, DisplayCategory::Other, DeviceCookie::Weight)
        .with_capabilities(vec![Capability::range(RangeSpec {
            instance: WEIGHT_INSTANCE.to_string(),
            friendly_names: text_names(&["Weight"]),
            minimum: 0.0,
            maximum: 100.0,
            precision: 0.01,
            unit: Some("Weight.Kilograms"),
            controllable: false,
            retrievable: true,
            semantics: None,
        })])
}

/// General sensors: battery level, pH or absolute humidity; others are dropped
fn general(device: &HubDevice) -> Option<EndpointDescriptor> {
    let sensor_unit = if device.subtype == "Percentage"
        && device.name.to_lowercase().contains("battery")
    {
        SensorUnit::Percentage
    } else if device.data.contains("pH") {
        SensorUnit::Ph
    } else if device.data.contains("g/m³") {
        SensorUnit::AbsoluteHumidity
    } else {
        return None;
    };

    let capability = match sensor_unit {
        SensorUnit::Percentage => Capability::percentage_sensor(),
        SensorUnit::Ph => Capability::range(RangeSpec {
            instance: "Sensor.pH".to_string(),
            friendly_names: text_names(&["pH"]),
            minimum: 0.0,
            maximum: 14.0,
            precision: 0.1,
            unit: None,
            controllable: false,
            retrievable: true,
            semantics: None,
        }),
        SensorUnit::AbsoluteHumidity => Capability::range(RangeSpec {
            instance: "Sensor.AbsoluteHumidity".to_string(),
            friendly_names: text_names(&["Absolute Humidity"]),
            minimum: 0.0,
            maximum: 50.0,
            precision: 0.01,
            unit: Some("Alexa.Unit.Density.GramsPerCubicMeter"),
            controllable: false,
            retrievable: true,
            semantics: None,
        }),
    };

    Some(
        EndpointDescriptor::new(
            device,
            DisplayCategory::Other,
            DeviceCookie::GeneralSensor { sensor_unit },
        )
        .with_capabilities(vec![capability]),
    )
}

/// Fetch the device list and map it
///
/// A failed or empty listing is reported as hub connectivity trouble so the
/// platform does not mistake it for "no devices".
///
/// # Errors
///
/// Returns [`ErrorKind::HubConnectivityUnstable`] if the listing fails or is empty
pub async fn discover<C: HubClient + ?Sized>(
    hub: &C,
    pinned_version: Option<&str>,
) -> std::result::Result<Vec<EndpointDescriptor>, ErrorKind> {
    let listing = hub.list_devices().await.map_err(|e| {
        tracing::error!(error = %e, "failed to list hub devices");
        ErrorKind::HubConnectivityUnstable
    })?;

    if listing.devices.is_empty() {
        tracing::warn!("hub returned no devices");
        return Err(ErrorKind::HubConnectivityUnstable);
    }

    let version = pinned_version.or(listing.version.as_deref());
    let mapper = CapabilityMapper::new(HubCapabilities::negotiate(version));
    let endpoints = mapper.map(&listing.devices);

    tracing::info!(
        devices = listing.devices.len(),
        endpoints = endpoints.len(),
        "discovery complete"
    );
    Ok(endpoints)
}

/// Answer a discovery directive
pub async fn handle<C: HubClient + ?Sized>(
    hub: &C,
    directive: &Directive,
    pinned_version: Option<&str>,
) -> EventEnvelope {
    let builder = ResponseBuilder::new(&directive.header);

    let endpoints = match discover(hub, pinned_version).await {
        Ok(endpoints) => endpoints,
        Err(kind) => {
            return builder.error(ns::ALEXA, None, kind.wire_type(), kind.default_message());
        }
    };

    match serde_json::to_value(&endpoints) {
        Ok(endpoints) => builder.event(
            ns::DISCOVERY,
            "Discover.Response",
            None,
            json!({ "endpoints": endpoints }),
            None,
        ),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialise endpoints");
            let kind = ErrorKind::HubConnectivityUnstable;
            builder.error(ns::ALEXA, None, kind.wire_type(), kind.default_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, name: &str, device_type: &str) -> HubDevice {
        HubDevice {
            id: id.to_string(),
            name: name.to_string(),
            device_type: device_type.to_string(),
            plan_id: Some("1".to_string()),
            ..HubDevice::default()
        }
    }

    fn map(devices: &[HubDevice]) -> Vec<EndpointDescriptor> {
        CapabilityMapper::default().map(devices)
    }

    #[test]
    fn test_every_endpoint_ends_with_health_and_base() {
        let devices = vec![
            device("1", "Lamp", "Light/Switch"),
            device("2", "Movie", "Scene"),
            device("3", "Outside", "Temp"),
        ];
        for endpoint in map(&devices) {
            let interfaces = endpoint.interfaces();
            let n = interfaces.len();
            assert_eq!(interfaces[n - 2], ns::ENDPOINT_HEALTH);
            assert_eq!(interfaces[n - 1], ns::ALEXA);
        }
    }

    #[test]
    fn test_scene_and_group() {
        let devices = vec![device("4", "Movie", "Scene"), device("5", "Downstairs", "Group")];
        let endpoints = map(&devices);

        assert_eq!(endpoints[0].endpoint_id, "scene_4");
        assert_eq!(endpoints[0].display_categories, vec![DisplayCategory::SceneTrigger]);
        assert!(endpoints[0].has_interface(ns::SCENE));
        assert_eq!(endpoints[1].display_categories, vec![DisplayCategory::Switch]);
        assert!(endpoints[1].has_interface(ns::POWER));
        assert_eq!(
            endpoints[1].cookie,
            DeviceCookie::Scene {
                scene_id: "5".to_string(),
                group: true
            }
        );
    }

    #[test]
    fn test_dimmer_gets_brightness() {
        let mut dimmer = device("7", "Kitchen", "Light/Switch");
        dimmer.switch_type = Some("Dimmer".to_string());
        dimmer.max_dim_level = Some(15.0);
        let plain = HubDevice {
            switch_type: Some("On/Off".to_string()),
            ..device("8", "Porch", "Light/Switch")
        };

        let endpoints = map(&[dimmer, plain]);
        assert!(endpoints[0].has_interface(ns::BRIGHTNESS));
        assert!(matches!(
            endpoints[0].cookie,
            DeviceCookie::Dimmable { max_level: 15, .. }
        ));
        assert!(!endpoints[1].has_interface(ns::BRIGHTNESS));
        assert!(matches!(endpoints[1].cookie, DeviceCookie::Switch { .. }));
    }

    #[test]
    fn test_color_light() {
        let mut rgbww = device("9", "Desk", "Color Switch");
        rgbww.subtype = "RGBWW".to_string();
        rgbww.switch_type = Some("Dimmer".to_string());
        let mut rgb = device("10", "Strip", "Color Switch");
        rgb.subtype = "RGB".to_string();

        let endpoints = map(&[rgbww, rgb]);
        assert!(endpoints[0].has_interface(ns::COLOR));
        assert!(endpoints[0].has_interface(ns::COLOR_TEMPERATURE));
        assert!(endpoints[1].has_interface(ns::COLOR));
        assert!(!endpoints[1].has_interface(ns::COLOR_TEMPERATURE));
    }

    #[test]
    fn test_general_sensors() {
        let battery = HubDevice {
            subtype: "Percentage".to_string(),
            ..device("20", "Sensor Battery", "General")
        };
        let ph = HubDevice {
            data: "7.2 pH".to_string(),
            ..device("21", "Pool", "General")
        };
        let energy = HubDevice {
            data: "1234 kWh".to_string(),
            ..device("22", "Meter", "General")
        };

        let endpoints = map(&[battery, ph, energy]);
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints[0].has_interface(ns::PERCENTAGE));
        assert_eq!(
            endpoints[1].cookie,
            DeviceCookie::GeneralSensor {
                sensor_unit: SensorUnit::Ph
            }
        );
    }

    #[test]
    fn test_humidity_combo_before_plain_temperature() {
        let endpoints = map(&[
            device("30", "Bathroom", "Temp + Humidity"),
            device("31", "Cellar", "Humidity"),
        ]);
        assert_eq!(endpoints[0].display_categories, vec![DisplayCategory::TemperatureSensor]);
        assert!(endpoints[0].has_interface(ns::HUMIDITY_SENSOR));
        assert!(endpoints[0].has_interface(ns::TEMPERATURE_SENSOR));
        assert!(!endpoints[1].has_interface(ns::TEMPERATURE_SENSOR));
        assert_eq!(
            endpoints[1].cookie,
            DeviceCookie::Humidity {
                with_temperature: false
            }
        );
    }

    #[test]
    fn test_manufacturer_defaults() {
        let mut lamp = device("1", "Lamp", "Light/Switch");
        let endpoints = map(std::slice::from_ref(&lamp));
        assert_eq!(endpoints[0].manufacturer_name, "Domoticz");

        lamp.hardware_name = Some("Zigbee2MQTT".to_string());
        let endpoints = map(&[lamp]);
        assert_eq!(endpoints[0].manufacturer_name, "Zigbee2MQTT");
        assert_eq!(endpoints[0].description, "Light/Switch");
    }

    #[test]
    fn test_descriptor_serialization() {
        let endpoints = map(&[device("1", "Lamp", "Light/Switch")]);
        let value = serde_json::to_value(&endpoints[0]).unwrap();
        assert_eq!(value["endpointId"], "1");
        assert_eq!(value["friendlyName"], "Lamp");
        assert_eq!(value["displayCategories"][0], "LIGHT");
        assert_eq!(value["cookie"]["kind"], "switch");
    }
}
