//! `ReportState` assembly
//!
//! The cookie decides which readings are fetched. Every successful report
//! ends with the connectivity property.

use serde_json::json;

use super::{
    DispatchError, DispatchResult, Operation, clamp_percent, level_to_index, level_to_percent,
};
use crate::alexa::{ReportedProperty, Response, ns};
use crate::cookie::{DeviceCookie, SensorUnit};
use crate::discovery::{BLIND_INSTANCE, WEIGHT_INSTANCE};
use crate::discovery::selector::mode_value;
use crate::hub::{HubClient, HubDevice};

impl<C: HubClient + ?Sized> Operation<'_, C> {
    async fn read(&self, id: &str) -> DispatchResult<HubDevice> {
        self.hub.get_device(id).await.map_err(DispatchError::Offline)
    }

    fn temperature_property(&self, degrees: f64) -> ReportedProperty {
        self.property(ns::TEMPERATURE_SENSOR, "temperature", self.scale.value(degrees))
    }

    async fn thermostat_properties(&self) -> DispatchResult<Vec<ReportedProperty>> {
        let setpoint_id = self.cookie.setpoint_id(self.endpoint_id);
        let setpoint_device = self.read(setpoint_id).await?;
        let setpoint = setpoint_device
            .setpoint
            .or_else(|| setpoint_device.numeric_data())
            .ok_or_else(|| DispatchError::MissingReading(setpoint_id.to_string(), "setpoint"))?;

        let mut properties = vec![self.property(
            ns::THERMOSTAT,
            "targetSetpoint",
            self.scale.value(setpoint),
        )];

        let Some(temperature_id) = self.cookie.temperature_id(self.endpoint_id) else {
            return Ok(properties);
        };
        let linked;
        let sensor = if temperature_id == setpoint_id {
            &setpoint_device
        } else {
            linked = self.read(temperature_id).await?;
            &linked
        };

        match sensor.temp {
            Some(degrees) => properties.push(self.temperature_property(degrees)),
            None => tracing::debug!(id = %temperature_id, "no temperature reading"),
        }
        if matches!(self.cookie, DeviceCookie::Thermostat { has_humidity: true, .. }) {
            match sensor.humidity {
                Some(humidity) => properties.push(self.property(
                    ns::HUMIDITY_SENSOR,
                    "humidity",
                    json!(clamp_percent(humidity)),
                )),
                None => tracing::debug!(id = %temperature_id, "no humidity reading"),
            }
        }

        Ok(properties)
    }

    async fn sensor_properties(&self, with_temperature: bool) -> DispatchResult<Vec<ReportedProperty>> {
        let device = self.read(self.target()).await?;
        let mut properties = Vec::new();

        if with_temperature {
            let degrees = device
                .temp
                .ok_or_else(|| DispatchError::MissingReading(device.id.clone(), "temperature"))?;
            properties.push(self.temperature_property(degrees));
        }
        if matches!(self.cookie, DeviceCookie::Humidity { .. }) {
            let humidity = device
                .humidity
                .ok_or_else(|| DispatchError::MissingReading(device.id.clone(), "humidity"))?;
            properties.push(self.property(
                ns::HUMIDITY_SENSOR,
                "humidity",
                json!(clamp_percent(humidity)),
            ));
        }

        Ok(properties)
    }

    async fn light_properties(&self, max_level: Option<u32>) -> DispatchResult<Vec<ReportedProperty>> {
        let device = self.read(self.target()).await?;
        let power = if device.is_on() { "ON" } else { "OFF" };
        let mut properties = vec![self.property(ns::POWER, "powerState", json!(power))];

        if let Some(max_level) = max_level {
            let brightness = level_to_percent(device.level.unwrap_or(0.0), max_level);
            properties.push(self.property(ns::BRIGHTNESS, "brightness", json!(brightness)));
        }

        Ok(properties)
    }

    async fn lock_properties(&self) -> DispatchResult<Vec<ReportedProperty>> {
        let device = self.read(self.target()).await?;
        let locked = matches!(
            device.status.trim().to_lowercase().as_str(),
            "locked" | "on" | "closed"
        );
        let state = if locked { "LOCKED" } else { "UNLOCKED" };
        Ok(vec![self.property(ns::LOCK, "lockState", json!(state))])
    }

    async fn blind_properties(&self, retrievable: bool) -> DispatchResult<Vec<ReportedProperty>> {
        if !retrievable {
            return Ok(Vec::new());
        }
        let device = self.read(self.target()).await?;
        let position = level_to_percent(device.level.unwrap_or(0.0), 100);
        Ok(vec![
            self.property(ns::RANGE, "rangeValue", json!(position))
                .with_instance(BLIND_INSTANCE),
        ])
    }

    async fn selector_properties(&self, instance: &str) -> DispatchResult<Vec<ReportedProperty>> {
        let device = self.read(self.target()).await?;
        let index = level_to_index(device.level.unwrap_or(0.0));
        let value = usize::try_from(index).map_or_else(|_| mode_value(0), mode_value);
        Ok(vec![
            self.property(ns::MODE, "mode", json!(value))
                .with_instance(instance),
        ])
    }

    async fn numeric_properties(&self) -> DispatchResult<Vec<ReportedProperty>> {
        let device = self.read(self.target()).await?;
        let value = device
            .numeric_data()
            .ok_or_else(|| DispatchError::MissingReading(device.id.clone(), "reading"))?;

        let property = match self.cookie {
            DeviceCookie::GeneralSensor {
                sensor_unit: SensorUnit::Percentage,
            } => self.property(ns::PERCENTAGE, "percentage", json!(clamp_percent(value))),
            DeviceCookie::GeneralSensor { sensor_unit } => {
                let instance = sensor_unit.range_instance().unwrap_or_default();
                self.property(ns::RANGE, "rangeValue", json!(value))
                    .with_instance(instance)
            }
            _ => self
                .property(ns::RANGE, "rangeValue", json!(value))
                .with_instance(WEIGHT_INSTANCE),
        };
        Ok(vec![property])
    }
}

/// Read current state for the endpoint named by the operation
pub(super) async fn report_state<C: HubClient + ?Sized>(
    op: &Operation<'_, C>,
) -> DispatchResult<Response> {
    let mut properties = match op.cookie {
        DeviceCookie::Scene { .. } => {
            return Err(DispatchError::StateReportUnsupported(op.cookie.kind()));
        }
        DeviceCookie::Thermostat { .. } => op.thermostat_properties().await?,
        DeviceCookie::Temperature => op.sensor_properties(true).await?,
        DeviceCookie::Humidity { with_temperature } => {
            op.sensor_properties(*with_temperature).await?
        }
        DeviceCookie::Switch { .. } => op.light_properties(None).await?,
        DeviceCookie::Dimmable { max_level, .. } => op.light_properties(Some(*max_level)).await?,
        DeviceCookie::Lock { .. } => op.lock_properties().await?,
        DeviceCookie::Blind {
            position_retrievable,
            ..
        } => op.blind_properties(*position_retrievable).await?,
        DeviceCookie::Selector { instance, .. } => op.selector_properties(instance).await?,
        DeviceCookie::Weight | DeviceCookie::GeneralSensor { .. } => {
            op.numeric_properties().await?
        }
    };

    properties.push(ReportedProperty::connectivity_ok(op.now));

    Ok(Response::StateReport {
        endpoint_id: op.endpoint_id.to_string(),
        properties,
    })
}
