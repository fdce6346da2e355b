//! Directive dispatch
//!
//! Routes a control or query directive to hub operations and turns the
//! outcome into a [`Response`]. Dispatch never fails: every problem becomes
//! an error response.

pub mod color;
mod report;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use thiserror::Error;

use crate::alexa::{Directive, ErrorKind, ReportedProperty, Response, TemperatureScale, ns};
use crate::cookie::{DeviceCookie, hub_id};
use crate::discovery::BLIND_INSTANCE;
use crate::discovery::selector::{LEVEL_STEP, mode_value};
use crate::hub::{HubClient, SceneCommand, SwitchCommand};

use color::Hsb;

/// Why a directive could not be carried out
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Hub read or write failed
    #[error("hub unreachable: {0}")]
    Offline(#[source] crate::Error),

    /// Device answered without the reading needed
    #[error("device {0} did not report a {1}")]
    MissingReading(String, &'static str),

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("scene activation failed: {0}")]
    SceneActivation(#[source] crate::Error),

    #[error("state report not supported for {0} endpoints")]
    StateReportUnsupported(&'static str),

    #[error("unsupported directive {namespace}.{name}")]
    Unsupported { namespace: String, name: String },
}

impl DispatchError {
    /// Outbound error vocabulary for this failure
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Offline(_) | Self::MissingReading(..) => ErrorKind::DeviceOffline,
            Self::InvalidMode(_) => ErrorKind::InvalidMode,
            Self::InvalidValue(_) => ErrorKind::InvalidValue,
            Self::SceneActivation(_) => ErrorKind::SceneActivationFailed,
            Self::StateReportUnsupported(_) => ErrorKind::StateReportUnsupported,
            Self::Unsupported { .. } => ErrorKind::UnsupportedDirective,
        }
    }
}

type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Routes directives to one hub
pub struct DirectiveDispatcher<'a, C: HubClient + ?Sized> {
    hub: &'a C,
    scale: TemperatureScale,
}

impl<'a, C: HubClient + ?Sized> DirectiveDispatcher<'a, C> {
    #[must_use]
    pub const fn new(hub: &'a C, scale: TemperatureScale) -> Self {
        Self { hub, scale }
    }

    /// Handle one directive
    pub async fn dispatch(&self, directive: &Directive) -> Response {
        let now = Utc::now();
        let endpoint_id = directive.endpoint_id();

        match self.route(directive, now).await {
            Ok(response) => {
                tracing::debug!(
                    namespace = %directive.namespace(),
                    name = %directive.action(),
                    endpoint_id = ?endpoint_id,
                    "directive handled"
                );
                response
            }
            Err(e) => {
                tracing::warn!(
                    namespace = %directive.namespace(),
                    name = %directive.action(),
                    endpoint_id = ?endpoint_id,
                    error = %e,
                    "directive failed"
                );
                Response::error(endpoint_id, e.kind())
            }
        }
    }

    async fn route(&self, directive: &Directive, now: DateTime<Utc>) -> DispatchResult<Response> {
        let unsupported = || DispatchError::Unsupported {
            namespace: directive.namespace().to_string(),
            name: directive.action().to_string(),
        };

        let endpoint_id = directive.endpoint_id().ok_or_else(unsupported)?;
        let cookie = directive.cookie().ok_or_else(unsupported)?;
        let payload = &directive.payload;

        let op = Operation {
            hub: self.hub,
            scale: self.scale,
            endpoint_id,
            cookie: &cookie,
            now,
        };

        match (directive.namespace(), directive.action()) {
            (ns::POWER, "TurnOn") => op.power(true).await,
            (ns::POWER, "TurnOff") => op.power(false).await,
            (ns::BRIGHTNESS, "SetBrightness") => {
                let brightness = number(payload, "/brightness")?;
                op.set_brightness(brightness).await
            }
            (ns::BRIGHTNESS, "AdjustBrightness") => {
                let delta = number(payload, "/brightnessDelta")?;
                op.adjust_brightness(delta).await
            }
            (ns::COLOR, "SetColor") => {
                let color: Hsb = payload
                    .get("color")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .ok_or_else(|| DispatchError::InvalidValue("color".to_string()))?;
                op.set_color(color).await
            }
            (ns::COLOR_TEMPERATURE, "SetColorTemperature") => {
                let kelvin = number(payload, "/colorTemperatureInKelvin")?;
                op.set_kelvin(kelvin).await
            }
            (ns::SCENE, "Activate") => op.activate_scene().await,
            (ns::LOCK, "Lock") => op.lock(true).await,
            (ns::LOCK, "Unlock") => op.lock(false).await,
            (ns::THERMOSTAT, "SetTargetTemperature") => {
                let target = temperature(payload, "/targetSetpoint", self.scale, false)?;
                op.set_setpoint(target).await
            }
            (ns::THERMOSTAT, "AdjustTargetTemperature") => {
                let delta = temperature(payload, "/targetSetpointDelta", self.scale, true)?;
                op.adjust_setpoint(delta).await
            }
            (ns::MODE, "SetMode") => {
                let mode = payload
                    .get("mode")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DispatchError::InvalidMode("missing mode".to_string()))?;
                op.set_mode(mode).await
            }
            (ns::MODE, "AdjustMode") => {
                let delta = payload.get("modeDelta").and_then(Value::as_i64).unwrap_or(1);
                op.adjust_mode(delta).await
            }
            (ns::RANGE, "SetRangeValue") => {
                let value = number(payload, "/rangeValue")?;
                op.set_range(value).await
            }
            (ns::RANGE, "AdjustRangeValue") => {
                let delta = number(payload, "/rangeValueDelta")?;
                op.adjust_range(delta).await
            }
            (ns::ALEXA, "ReportState") => report::report_state(&op).await,
            _ => Err(unsupported()),
        }
    }
}

/// One directive against one endpoint
struct Operation<'a, C: HubClient + ?Sized> {
    hub: &'a C,
    scale: TemperatureScale,
    endpoint_id: &'a str,
    cookie: &'a DeviceCookie,
    /// Sample time shared by every property in the response
    now: DateTime<Utc>,
}

impl<C: HubClient + ?Sized> Operation<'_, C> {
    fn unsupported(&self, namespace: &str, name: &str) -> DispatchError {
        tracing::debug!(kind = self.cookie.kind(), namespace, name, "not supported for device kind");
        DispatchError::Unsupported {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    fn target(&self) -> &str {
        self.cookie.target_id(self.endpoint_id)
    }

    fn property(&self, namespace: &str, name: &str, value: Value) -> ReportedProperty {
        ReportedProperty::new(namespace, name, value, self.now)
    }

    fn changed(&self, properties: Vec<ReportedProperty>) -> Response {
        Response::StateChange {
            endpoint_id: self.endpoint_id.to_string(),
            properties,
        }
    }

    async fn power(&self, on: bool) -> DispatchResult<Response> {
        let target = self.target();
        let result = match self.cookie {
            DeviceCookie::Scene { .. } => {
                let command = if on { SceneCommand::On } else { SceneCommand::Off };
                self.hub.write_scene(target, command).await
            }
            DeviceCookie::Blind { .. } => {
                let command = if on { SwitchCommand::Open } else { SwitchCommand::Stop };
                self.hub.write_switch(target, command).await
            }
            DeviceCookie::Switch { .. }
            | DeviceCookie::Dimmable { .. }
            | DeviceCookie::Lock { .. }
            | DeviceCookie::Selector { .. } => {
                let command = if on { SwitchCommand::On } else { SwitchCommand::Off };
                self.hub.write_switch(target, command).await
            }
            _ => return Err(self.unsupported(ns::POWER, if on { "TurnOn" } else { "TurnOff" })),
        };
        result.map_err(DispatchError::Offline)?;

        let state = if on { "ON" } else { "OFF" };
        Ok(self.changed(vec![self.property(ns::POWER, "powerState", json!(state))]))
    }

    /// Hub dim range for brightness writes
    fn max_level(&self) -> DispatchResult<u32> {
        match self.cookie {
            DeviceCookie::Dimmable { max_level, .. } if *max_level > 0 => Ok(*max_level),
            DeviceCookie::Dimmable { .. } | DeviceCookie::Switch { .. } => Ok(100),
            _ => Err(self.unsupported(ns::BRIGHTNESS, "SetBrightness")),
        }
    }

    async fn write_brightness(&self, brightness: u32) -> DispatchResult<Response> {
        let max_level = self.max_level()?;
        let level = percent_to_level(brightness, max_level);
        self.hub
            .write_dim_level(self.target(), level)
            .await
            .map_err(DispatchError::Offline)?;

        Ok(self.changed(vec![self.property(
            ns::BRIGHTNESS,
            "brightness",
            json!(brightness),
        )]))
    }

    async fn set_brightness(&self, brightness: f64) -> DispatchResult<Response> {
        self.write_brightness(clamp_percent(brightness)).await
    }

    async fn adjust_brightness(&self, delta: f64) -> DispatchResult<Response> {
        let max_level = self.max_level()?;
        let device = self
            .hub
            .get_device(self.target())
            .await
            .map_err(DispatchError::Offline)?;
        let current = level_to_percent(device.level.unwrap_or(0.0), max_level);

        self.write_brightness(clamp_percent(f64::from(current) + delta))
            .await
    }

    async fn set_color(&self, color: Hsb) -> DispatchResult<Response> {
        if !matches!(self.cookie, DeviceCookie::Dimmable { .. } | DeviceCookie::Switch { .. }) {
            return Err(self.unsupported(ns::COLOR, "SetColor"));
        }

        let rgb = color.chroma();
        tracing::debug!(endpoint_id = %self.endpoint_id, hex = %rgb.to_hex(), "setting colour");
        self.hub
            .write_color(self.target(), rgb)
            .await
            .map_err(DispatchError::Offline)?;

        Ok(self.changed(vec![self.property(
            ns::COLOR,
            "color",
            json!({
                "hue": color.hue,
                "saturation": color.saturation,
                "brightness": color.brightness
            }),
        )]))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn set_kelvin(&self, kelvin: f64) -> DispatchResult<Response> {
        if !matches!(self.cookie, DeviceCookie::Dimmable { .. } | DeviceCookie::Switch { .. }) {
            return Err(self.unsupported(ns::COLOR_TEMPERATURE, "SetColorTemperature"));
        }
        if !(1000.0..=10000.0).contains(&kelvin) {
            return Err(DispatchError::InvalidValue(format!("{kelvin} K out of range")));
        }

        let kelvin = kelvin.round() as u32;
        self.hub
            .write_kelvin(self.target(), kelvin)
            .await
            .map_err(DispatchError::Offline)?;

        Ok(self.changed(vec![self.property(
            ns::COLOR_TEMPERATURE,
            "colorTemperatureInKelvin",
            json!(kelvin),
        )]))
    }

    async fn activate_scene(&self) -> DispatchResult<Response> {
        let DeviceCookie::Scene { scene_id, .. } = self.cookie else {
            return Err(self.unsupported(ns::SCENE, "Activate"));
        };

        self.hub
            .write_scene(scene_id, SceneCommand::On)
            .await
            .map_err(DispatchError::SceneActivation)?;

        tracing::info!(scene_id = %scene_id, "scene activated");
        Ok(Response::ActivationStarted {
            endpoint_id: self.endpoint_id.to_string(),
            timestamp: self.now,
        })
    }

    async fn lock(&self, lock: bool) -> DispatchResult<Response> {
        if !matches!(self.cookie, DeviceCookie::Lock { .. }) {
            return Err(self.unsupported(ns::LOCK, if lock { "Lock" } else { "Unlock" }));
        }

        let command = if lock { SwitchCommand::On } else { SwitchCommand::Off };
        self.hub
            .write_switch(self.target(), command)
            .await
            .map_err(DispatchError::Offline)?;

        let state = if lock { "LOCKED" } else { "UNLOCKED" };
        Ok(self.changed(vec![self.property(ns::LOCK, "lockState", json!(state))]))
    }

    fn setpoint_target(&self) -> DispatchResult<&str> {
        match self.cookie {
            DeviceCookie::Thermostat { .. } => Ok(self.cookie.setpoint_id(self.endpoint_id)),
            _ => Err(self.unsupported(ns::THERMOSTAT, "SetTargetTemperature")),
        }
    }

    async fn write_setpoint(&self, target: &str, value: f64) -> DispatchResult<Response> {
        self.hub
            .write_setpoint(target, value)
            .await
            .map_err(DispatchError::Offline)?;

        Ok(self.changed(vec![self.property(
            ns::THERMOSTAT,
            "targetSetpoint",
            self.scale.value(value),
        )]))
    }

    async fn set_setpoint(&self, value: f64) -> DispatchResult<Response> {
        let target = self.setpoint_target()?;
        self.write_setpoint(target, value).await
    }

    async fn adjust_setpoint(&self, delta: f64) -> DispatchResult<Response> {
        let target = self.setpoint_target()?;
        let device = self
            .hub
            .get_device(target)
            .await
            .map_err(DispatchError::Offline)?;
        let current = device
            .setpoint
            .or_else(|| device.numeric_data())
            .ok_or_else(|| DispatchError::MissingReading(target.to_string(), "setpoint"))?;

        self.write_setpoint(target, round_tenth(current + delta)).await
    }

    fn selector(&self) -> DispatchResult<(&str, &[String])> {
        match self.cookie {
            DeviceCookie::Selector { instance, modes } => Ok((instance.as_str(), modes.as_slice())),
            _ => Err(self.unsupported(ns::MODE, "SetMode")),
        }
    }

    async fn write_mode(&self, instance: &str, index: usize) -> DispatchResult<Response> {
        let value = mode_value(index);
        let level = u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(LEVEL_STEP))
            .ok_or_else(|| DispatchError::InvalidMode(value.clone()))?;

        self.hub
            .write_dim_level(hub_id(self.endpoint_id), level)
            .await
            .map_err(DispatchError::Offline)?;

        Ok(self.changed(vec![
            self.property(ns::MODE, "mode", json!(value))
                .with_instance(instance),
        ]))
    }

    async fn set_mode(&self, mode: &str) -> DispatchResult<Response> {
        let (instance, modes) = self.selector()?;
        let index = parse_mode(mode)
            .filter(|index| *index < modes.len())
            .ok_or_else(|| DispatchError::InvalidMode(mode.to_string()))?;

        self.write_mode(instance, index).await
    }

    async fn adjust_mode(&self, delta: i64) -> DispatchResult<Response> {
        let (instance, modes) = self.selector()?;
        let count = i64::try_from(modes.len())
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| DispatchError::InvalidMode("selector has no modes".to_string()))?;

        let device = self
            .hub
            .get_device(hub_id(self.endpoint_id))
            .await
            .map_err(DispatchError::Offline)?;
        let current = level_to_index(device.level.unwrap_or(0.0));

        let next = (current + delta).rem_euclid(count);
        let next = usize::try_from(next)
            .map_err(|_| DispatchError::InvalidMode(format!("mode index {next}")))?;
        self.write_mode(instance, next).await
    }

    fn blind(&self, name: &str) -> DispatchResult<()> {
        match self.cookie {
            DeviceCookie::Blind { .. } => Ok(()),
            _ => Err(self.unsupported(ns::RANGE, name)),
        }
    }

    /// Move a blind; fully open and fully closed use the dedicated commands
    async fn write_position(&self, position: u32) -> DispatchResult<Response> {
        let target = self.target();
        let result = match position {
            0 => self.hub.write_switch(target, SwitchCommand::Close).await,
            100 => self.hub.write_switch(target, SwitchCommand::Open).await,
            level => self.hub.write_dim_level(target, level).await,
        };
        result.map_err(DispatchError::Offline)?;

        Ok(self.changed(vec![
            self.property(ns::RANGE, "rangeValue", json!(position))
                .with_instance(BLIND_INSTANCE),
        ]))
    }

    async fn set_range(&self, value: f64) -> DispatchResult<Response> {
        self.blind("SetRangeValue")?;
        self.write_position(clamp_percent(value)).await
    }

    async fn adjust_range(&self, delta: f64) -> DispatchResult<Response> {
        self.blind("AdjustRangeValue")?;
        let device = self
            .hub
            .get_device(self.target())
            .await
            .map_err(DispatchError::Offline)?;
        let current = device.level.unwrap_or(0.0);

        self.write_position(clamp_percent(current + delta)).await
    }
}

/// Numeric payload field at a JSON pointer
fn number(payload: &Value, pointer: &str) -> DispatchResult<f64> {
    payload
        .pointer(pointer)
        .and_then(Value::as_f64)
        .ok_or_else(|| DispatchError::InvalidValue(format!("missing {}", &pointer[1..])))
}

/// Temperature payload `{ value, scale }` converted to the hub's scale
fn temperature(
    payload: &Value,
    pointer: &str,
    hub_scale: TemperatureScale,
    is_delta: bool,
) -> DispatchResult<f64> {
    let value = number(payload, &format!("{pointer}/value"))?;
    let scale = payload
        .pointer(&format!("{pointer}/scale"))
        .and_then(Value::as_str)
        .unwrap_or(hub_scale.as_str());

    let celsius = match scale.to_uppercase().as_str() {
        "CELSIUS" => value,
        "FAHRENHEIT" if is_delta => value * 5.0 / 9.0,
        "FAHRENHEIT" => (value - 32.0) * 5.0 / 9.0,
        "KELVIN" if is_delta => value,
        "KELVIN" => value - 273.15,
        other => return Err(DispatchError::InvalidValue(format!("temperature scale {other}"))),
    };

    let converted = match hub_scale {
        TemperatureScale::Celsius => celsius,
        TemperatureScale::Fahrenheit if is_delta => celsius * 9.0 / 5.0,
        TemperatureScale::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    };
    Ok(round_tenth(converted))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_percent(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}

/// Brightness percentage to a hub level in `0..=max_level`, rounded
fn percent_to_level(percent: u32, max_level: u32) -> u32 {
    let level = (u64::from(percent.min(100)) * u64::from(max_level) + 50) / 100;
    u32::try_from(level).unwrap_or(max_level)
}

/// Hub level to a brightness percentage
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn level_to_percent(level: f64, max_level: u32) -> u32 {
    let max_level = f64::from(max_level.max(1));
    (level * 100.0 / max_level).round().clamp(0.0, 100.0) as u32
}

/// Selector mode index from a hub level
#[allow(clippy::cast_possible_truncation)]
fn level_to_index(level: f64) -> i64 {
    (level / f64::from(LEVEL_STEP)).round().max(0.0) as i64
}

/// Index of a `Level.<n>` mode value
fn parse_mode(mode: &str) -> Option<usize> {
    let level: u32 = mode.strip_prefix("Level.")?.trim().parse().ok()?;
    if level % LEVEL_STEP != 0 {
        return None;
    }
    usize::try_from(level / LEVEL_STEP).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conversion() {
        assert_eq!(percent_to_level(50, 100), 50);
        assert_eq!(percent_to_level(50, 15), 8);
        assert_eq!(percent_to_level(100, 15), 15);
        assert_eq!(percent_to_level(0, 15), 0);
        assert_eq!(percent_to_level(100, u32::MAX), u32::MAX);
        assert_eq!(percent_to_level(50, 100_000_000), 50_000_000);
        assert_eq!(level_to_percent(8.0, 15), 53);
        assert_eq!(level_to_percent(40.0, 100), 40);
        assert_eq!(level_to_percent(200.0, 100), 100);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(115.0), 100);
        assert_eq!(clamp_percent(-5.0), 0);
        assert_eq!(clamp_percent(42.4), 42);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("Level.0"), Some(0));
        assert_eq!(parse_mode("Level.20"), Some(2));
        assert_eq!(parse_mode("Level.15"), None);
        assert_eq!(parse_mode("TV"), None);
        assert_eq!(parse_mode("Level.abc"), None);
    }

    #[test]
    fn test_temperature_conversion() {
        let payload = json!({
            "targetSetpoint": { "value": 68.0, "scale": "FAHRENHEIT" },
            "targetSetpointDelta": { "value": 9.0, "scale": "FAHRENHEIT" }
        });
        let celsius = TemperatureScale::Celsius;
        assert_eq!(temperature(&payload, "/targetSetpoint", celsius, false).unwrap(), 20.0);
        assert_eq!(temperature(&payload, "/targetSetpointDelta", celsius, true).unwrap(), 5.0);

        let plain = json!({ "targetSetpoint": { "value": 21.5 } });
        assert_eq!(temperature(&plain, "/targetSetpoint", celsius, false).unwrap(), 21.5);

        let bogus = json!({ "targetSetpoint": { "value": 1.0, "scale": "RANKINE" } });
        assert!(matches!(
            temperature(&bogus, "/targetSetpoint", celsius, false),
            Err(DispatchError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_error_kinds() {
        let offline = DispatchError::Offline(crate::Error::Hub("timeout".to_string()));
        assert_eq!(offline.kind(), ErrorKind::DeviceOffline);
        assert_eq!(
            DispatchError::InvalidMode("x".to_string()).kind(),
            ErrorKind::InvalidMode
        );
        assert_eq!(
            DispatchError::StateReportUnsupported("scene").kind(),
            ErrorKind::StateReportUnsupported
        );
    }
}
