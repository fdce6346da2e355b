//! Response values and envelope construction
//!
//! Discovery, dispatch and grant handling never assemble envelopes by hand;
//! they hand a [`Response`] (or a raw payload) to [`ResponseBuilder`], which
//! copies the message id and correlation token from the request header.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use super::{Header, PAYLOAD_VERSION, ReportedProperty, ns};

/// Error vocabulary returned to the voice platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Hub write or read failed
    DeviceOffline,
    /// Mode value could not be parsed
    InvalidMode,
    /// Payload field missing or ill-typed
    InvalidValue,
    SceneActivationFailed,
    StateReportUnsupported,
    UnsupportedDirective,
    /// Hub listing failed or returned nothing
    HubConnectivityUnstable,
}

impl ErrorKind {
    /// Error `type` value on the wire
    #[must_use]
    pub const fn wire_type(self) -> &'static str {
        match self {
            Self::DeviceOffline | Self::SceneActivationFailed => "ENDPOINT_UNREACHABLE",
            Self::InvalidMode | Self::InvalidValue => "INVALID_VALUE",
            Self::StateReportUnsupported | Self::UnsupportedDirective => "INVALID_DIRECTIVE",
            Self::HubConnectivityUnstable => "BRIDGE_UNREACHABLE",
        }
    }

    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::DeviceOffline => "Device offline",
            Self::InvalidMode => "Invalid mode",
            Self::InvalidValue => "Invalid value",
            Self::SceneActivationFailed => "Scene activation failed",
            Self::StateReportUnsupported => "State report not supported for this device",
            Self::UnsupportedDirective => "Unsupported directive",
            Self::HubConnectivityUnstable => "Hub connectivity unstable",
        }
    }
}

/// Outcome of handling a directive, before it is wrapped in an envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Generic acknowledgement of a control directive
    StateChange {
        endpoint_id: String,
        properties: Vec<ReportedProperty>,
    },
    /// Answer to `ReportState`; always carries connectivity
    StateReport {
        endpoint_id: String,
        properties: Vec<ReportedProperty>,
    },
    /// Scene activation acknowledgement
    ActivationStarted {
        endpoint_id: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        endpoint_id: Option<String>,
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    /// Error response with the kind's default message
    #[must_use]
    pub fn error(endpoint_id: Option<&str>, kind: ErrorKind) -> Self {
        Self::Error {
            endpoint_id: endpoint_id.map(ToString::to_string),
            kind,
            message: kind.default_message().to_string(),
        }
    }

    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Reported properties, empty for activation and error responses
    #[must_use]
    pub fn properties(&self) -> &[ReportedProperty] {
        match self {
            Self::StateChange { properties, .. } | Self::StateReport { properties, .. } => {
                properties
            }
            _ => &[],
        }
    }

    /// First property with the given namespace and name
    #[must_use]
    pub fn property(&self, namespace: &str, name: &str) -> Option<&ReportedProperty> {
        self.properties()
            .iter()
            .find(|p| p.namespace == namespace && p.name == name)
    }
}

/// Outbound envelope
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<EventContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub header: Header,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EventEndpoint>,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEndpoint {
    pub endpoint_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventContext {
    pub properties: Vec<ReportedProperty>,
}

/// Builds envelopes answering one request header
#[derive(Debug, Clone, Copy)]
pub struct ResponseBuilder<'a> {
    request: &'a Header,
}

impl<'a> ResponseBuilder<'a> {
    #[must_use]
    pub const fn new(request: &'a Header) -> Self {
        Self { request }
    }

    /// Response header echoing message id and correlation token
    #[must_use]
    pub fn header(&self, namespace: &str, name: &str) -> Header {
        Header {
            namespace: namespace.to_string(),
            name: name.to_string(),
            payload_version: PAYLOAD_VERSION.to_string(),
            message_id: self.request.message_id.clone(),
            correlation_token: self.request.correlation_token.clone(),
        }
    }

    /// Envelope with an arbitrary payload
    #[must_use]
    pub fn event(
        &self,
        namespace: &str,
        name: &str,
        endpoint_id: Option<&str>,
        payload: Value,
        properties: Option<Vec<ReportedProperty>>,
    ) -> EventEnvelope {
        EventEnvelope {
            event: Event {
                header: self.header(namespace, name),
                endpoint: endpoint_id.map(|id| EventEndpoint {
                    endpoint_id: id.to_string(),
                }),
                payload,
            },
            context: properties.map(|properties| EventContext { properties }),
        }
    }

    /// `ErrorResponse` in the given namespace with a raw wire type
    #[must_use]
    pub fn error(
        &self,
        namespace: &str,
        endpoint_id: Option<&str>,
        wire_type: &str,
        message: &str,
    ) -> EventEnvelope {
        self.event(
            namespace,
            "ErrorResponse",
            endpoint_id,
            json!({ "type": wire_type, "message": message }),
            None,
        )
    }

    /// Wrap a dispatch outcome
    #[must_use]
    pub fn build(&self, response: &Response) -> EventEnvelope {
        match response {
            Response::StateChange {
                endpoint_id,
                properties,
            } => self.event(
                ns::ALEXA,
                "Response",
                Some(endpoint_id.as_str()),
                json!({}),
                Some(properties.clone()),
            ),
            Response::StateReport {
                endpoint_id,
                properties,
            } => self.event(
                ns::ALEXA,
                "StateReport",
                Some(endpoint_id.as_str()),
                json!({}),
                Some(properties.clone()),
            ),
            Response::ActivationStarted {
                endpoint_id,
                timestamp,
            } => {
                let payload = json!({
                    "cause": { "type": "VOICE_INTERACTION" },
                    "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
                });
                self.event(
                    ns::SCENE,
                    "ActivationStarted",
                    Some(endpoint_id.as_str()),
                    payload,
                    Some(Vec::new()),
                )
            }
            Response::Error {
                endpoint_id,
                kind,
                message,
            } => self.error(ns::ALEXA, endpoint_id.as_deref(), kind.wire_type(), message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_header() -> Header {
        Header {
            namespace: "Alexa.PowerController".to_string(),
            name: "TurnOn".to_string(),
            payload_version: "3".to_string(),
            message_id: "msg-42".to_string(),
            correlation_token: Some("corr-42".to_string()),
        }
    }

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_state_change_envelope() {
        let header = request_header();
        let response = Response::StateChange {
            endpoint_id: "12".to_string(),
            properties: vec![ReportedProperty::new(
                ns::POWER,
                "powerState",
                json!("ON"),
                at(),
            )],
        };
        let value = serde_json::to_value(ResponseBuilder::new(&header).build(&response)).unwrap();

        assert_eq!(value["event"]["header"]["namespace"], "Alexa");
        assert_eq!(value["event"]["header"]["name"], "Response");
        assert_eq!(value["event"]["header"]["messageId"], "msg-42");
        assert_eq!(value["event"]["header"]["correlationToken"], "corr-42");
        assert_eq!(value["event"]["endpoint"]["endpointId"], "12");
        assert_eq!(value["context"]["properties"][0]["value"], "ON");
    }

    #[test]
    fn test_activation_started_envelope() {
        let header = request_header();
        let response = Response::ActivationStarted {
            endpoint_id: "scene_3".to_string(),
            timestamp: at(),
        };
        let value = serde_json::to_value(ResponseBuilder::new(&header).build(&response)).unwrap();

        assert_eq!(value["event"]["header"]["namespace"], "Alexa.SceneController");
        assert_eq!(value["event"]["header"]["name"], "ActivationStarted");
        assert_eq!(value["event"]["payload"]["cause"]["type"], "VOICE_INTERACTION");
        assert_eq!(value["event"]["payload"]["timestamp"], "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_error_envelope() {
        let header = request_header();
        let response = Response::error(Some("12"), ErrorKind::DeviceOffline);
        let value = serde_json::to_value(ResponseBuilder::new(&header).build(&response)).unwrap();

        assert_eq!(value["event"]["header"]["name"], "ErrorResponse");
        assert_eq!(value["event"]["payload"]["type"], "ENDPOINT_UNREACHABLE");
        assert_eq!(value["event"]["payload"]["message"], "Device offline");
        assert!(value.get("context").is_none());
    }

    #[test]
    fn test_response_accessors() {
        let response = Response::StateReport {
            endpoint_id: "1".to_string(),
            properties: vec![ReportedProperty::connectivity_ok(at())],
        };
        assert!(response.property(ns::ENDPOINT_HEALTH, "connectivity").is_some());
        assert!(response.error_kind().is_none());
        assert_eq!(
            Response::error(None, ErrorKind::InvalidMode).error_kind(),
            Some(ErrorKind::InvalidMode)
        );
    }
}
