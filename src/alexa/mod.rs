//! Smart Home directive protocol types
//!
//! Inbound directives are deserialised into [`Directive`]; everything the
//! bridge sends back is built by [`response::ResponseBuilder`] so that discovery,
//! control and grant handling all produce the same envelope shape.

pub mod capability;
pub mod response;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};

use crate::cookie::DeviceCookie;
use crate::{Error, Result};

pub use capability::{Capability, DisplayCategory, RangeSpec};
pub use response::{ErrorKind, EventEnvelope, Response, ResponseBuilder};

/// Interface namespaces used by the bridge
pub mod ns {
    pub const ALEXA: &str = "Alexa";
    pub const DISCOVERY: &str = "Alexa.Discovery";
    pub const LEGACY_DISCOVERY: &str = "Alexa.ConnectedHome.Discovery";
    pub const AUTHORIZATION: &str = "Alexa.Authorization";
    pub const POWER: &str = "Alexa.PowerController";
    pub const BRIGHTNESS: &str = "Alexa.BrightnessController";
    pub const COLOR: &str = "Alexa.ColorController";
    pub const COLOR_TEMPERATURE: &str = "Alexa.ColorTemperatureController";
    pub const SCENE: &str = "Alexa.SceneController";
    pub const LOCK: &str = "Alexa.LockController";
    pub const THERMOSTAT: &str = "Alexa.ThermostatController";
    pub const TEMPERATURE_SENSOR: &str = "Alexa.TemperatureSensor";
    pub const HUMIDITY_SENSOR: &str = "Alexa.HumiditySensor";
    pub const MODE: &str = "Alexa.ModeController";
    pub const RANGE: &str = "Alexa.RangeController";
    pub const PERCENTAGE: &str = "Alexa.PercentageController";
    pub const ENDPOINT_HEALTH: &str = "Alexa.EndpointHealth";
}

/// Protocol payload version emitted on every event
pub const PAYLOAD_VERSION: &str = "3";

/// Uncertainty attached to every reported property sample
pub const SAMPLE_UNCERTAINTY_MS: u32 = 500;

fn default_payload_version() -> String {
    PAYLOAD_VERSION.to_string()
}

/// Directive/event header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub namespace: String,
    pub name: String,
    #[serde(default = "default_payload_version")]
    pub payload_version: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// Top-level inbound request
#[derive(Debug, Clone, Deserialize)]
pub struct DirectiveEnvelope {
    pub directive: Directive,
}

/// An inbound directive
#[derive(Debug, Clone, Deserialize)]
pub struct Directive {
    pub header: Header,
    #[serde(default)]
    pub endpoint: Option<DirectiveEndpoint>,
    #[serde(default)]
    pub payload: Value,
}

/// Endpoint addressed by a directive
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    pub endpoint_id: String,

    /// Round-tripped discovery cookie, kept raw so an unknown shape does not
    /// reject the whole directive
    #[serde(default)]
    pub cookie: Value,

    #[serde(default)]
    pub scope: Option<Scope>,
}

/// Caller credential attached to a directive
#[derive(Debug, Clone, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl Directive {
    /// Interface namespace of the directive
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.header.namespace
    }

    /// Action name of the directive
    #[must_use]
    pub fn action(&self) -> &str {
        &self.header.name
    }

    /// Endpoint id, if the directive addresses one
    #[must_use]
    pub fn endpoint_id(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.endpoint_id.as_str())
    }

    /// Decode the discovery cookie carried by the endpoint
    ///
    /// Returns `None` when there is no cookie or it does not describe a known
    /// device kind.
    #[must_use]
    pub fn cookie(&self) -> Option<DeviceCookie> {
        let raw = &self.endpoint.as_ref()?.cookie;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                tracing::warn!(error = %e, "unrecognised endpoint cookie");
                None
            }
        }
    }

    /// Bearer token from the endpoint scope, or from the payload scope
    /// (discovery and grant directives carry it there), or the legacy
    /// `accessToken` field
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        if let Some(token) = self
            .endpoint
            .as_ref()
            .and_then(|e| e.scope.as_ref())
            .and_then(|s| s.token.as_deref())
        {
            return Some(token);
        }

        ["scope", "grantee"]
            .iter()
            .find_map(|key| {
                self.payload
                    .get(key)
                    .and_then(|s| s.get("token"))
                    .and_then(Value::as_str)
            })
            .or_else(|| self.payload.get("accessToken").and_then(Value::as_str))
    }
}

/// Temperature scale used in thermostat and sensor properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemperatureScale {
    Celsius,
    Fahrenheit,
}

impl TemperatureScale {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Celsius => "CELSIUS",
            Self::Fahrenheit => "FAHRENHEIT",
        }
    }

    /// Wire value for a temperature reading
    #[must_use]
    pub fn value(self, degrees: f64) -> Value {
        json!({ "value": degrees, "scale": self.as_str() })
    }
}

impl fmt::Display for TemperatureScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureScale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "CELSIUS" | "C" => Ok(Self::Celsius),
            "FAHRENHEIT" | "F" => Ok(Self::Fahrenheit),
            other => Err(Error::Config(format!("unknown temperature scale: {other}"))),
        }
    }
}

/// A property value reported back in a response context
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedProperty {
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub name: String,
    pub value: Value,
    #[serde(serialize_with = "serialize_timestamp")]
    pub time_of_sample: DateTime<Utc>,
    pub uncertainty_in_milliseconds: u32,
}

impl ReportedProperty {
    #[must_use]
    pub fn new(namespace: &str, name: &str, value: Value, sampled_at: DateTime<Utc>) -> Self {
        Self {
            namespace: namespace.to_string(),
            instance: None,
            name: name.to_string(),
            value,
            time_of_sample: sampled_at,
            uncertainty_in_milliseconds: SAMPLE_UNCERTAINTY_MS,
        }
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// The synthetic "device reachable" property carried by every state report
    #[must_use]
    pub fn connectivity_ok(sampled_at: DateTime<Utc>) -> Self {
        Self::new(
            ns::ENDPOINT_HEALTH,
            "connectivity",
            json!({ "value": "OK" }),
            sampled_at,
        )
    }
}

/// Serialise timestamps as RFC 3339 with millisecond precision
pub fn serialize_timestamp<S: Serializer>(
    at: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
