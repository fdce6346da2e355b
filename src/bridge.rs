//! Request entry point
//!
//! Validates the inbound envelope, normalises the legacy shape and switches on
//! the namespace: discovery, authorization grant, or device control.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::alexa::{Directive, DirectiveEnvelope, EventEnvelope, ResponseBuilder, ns};
use crate::config::Config;
use crate::dispatch::DirectiveDispatcher;
use crate::grant::{self, LwaClient};
use crate::hub::{DomoticzClient, HubClient};
use crate::{Error, Result, discovery};

/// Which handler a namespace belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Discovery,
    Authorization,
    Control,
}

impl Route {
    /// Pick the handler for a namespace
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedNamespace`] for anything outside the `Alexa` family
    pub fn for_namespace(namespace: &str) -> Result<Self> {
        match namespace {
            ns::DISCOVERY | ns::LEGACY_DISCOVERY => Ok(Self::Discovery),
            ns::AUTHORIZATION => Ok(Self::Authorization),
            other if other.starts_with(ns::ALEXA) => Ok(Self::Control),
            other => Err(Error::UnsupportedNamespace(other.to_string())),
        }
    }
}

/// Parse an inbound request body into a directive
///
/// Accepts `{"directive": {...}}` and the legacy `{"header": ..., "payload": ...}`
/// shape, whose appliance id and details become the endpoint id and cookie.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] if there is no header or namespace
pub fn parse_request(body: Value) -> Result<Directive> {
    let directive = if body.get("directive").is_some() {
        let envelope: DirectiveEnvelope = serde_json::from_value(body)
            .map_err(|e| Error::InvalidRequest(format!("malformed directive: {e}")))?;
        envelope.directive
    } else if body.get("header").is_some() {
        serde_json::from_value(normalise_legacy(body))
            .map_err(|e| Error::InvalidRequest(format!("malformed legacy request: {e}")))?
    } else {
        return Err(Error::InvalidRequest("missing directive header".to_string()));
    };

    if directive.namespace().is_empty() {
        return Err(Error::InvalidRequest("missing namespace".to_string()));
    }
    Ok(directive)
}

fn normalise_legacy(body: Value) -> Value {
    let Value::Object(mut fields) = body else {
        return body;
    };

    let payload = fields.remove("payload").unwrap_or_else(|| json!({}));
    let appliance = payload.get("appliance");
    let endpoint = appliance
        .and_then(|a| a.get("applianceId"))
        .and_then(Value::as_str)
        .map(|id| {
            let cookie = appliance
                .and_then(|a| a.get("additionalApplianceDetails"))
                .cloned()
                .unwrap_or(Value::Null);
            json!({ "endpointId": id, "cookie": cookie })
        });

    let mut directive = Map::new();
    if let Some(header) = fields.remove("header") {
        directive.insert("header".to_string(), header);
    }
    if let Some(endpoint) = endpoint {
        directive.insert("endpoint".to_string(), endpoint);
    }
    directive.insert("payload".to_string(), payload);
    Value::Object(directive)
}

/// Handle one directive against the given hub
///
/// # Errors
///
/// Returns [`Error::UnsupportedNamespace`] or [`Error::InvalidRequest`] when
/// the directive cannot be routed; hub failures become error events instead.
pub async fn handle<C: HubClient + ?Sized>(
    hub: &C,
    config: &Config,
    directive: &Directive,
) -> Result<EventEnvelope> {
    tracing::debug!(
        namespace = %directive.namespace(),
        name = %directive.action(),
        message_id = %directive.header.message_id,
        "handling directive"
    );

    match Route::for_namespace(directive.namespace())? {
        Route::Discovery => {
            Ok(discovery::handle(hub, directive, config.hub.version.as_deref()).await)
        }
        Route::Authorization => Ok(accept_grant(config, directive).await),
        Route::Control => {
            if directive.endpoint_id().is_none() {
                return Err(Error::InvalidRequest(format!(
                    "{}.{} without endpoint",
                    directive.namespace(),
                    directive.action()
                )));
            }
            let dispatcher = DirectiveDispatcher::new(hub, config.hub.temperature_scale);
            let response = dispatcher.dispatch(directive).await;
            Ok(ResponseBuilder::new(&directive.header).build(&response))
        }
    }
}

async fn accept_grant(config: &Config, directive: &Directive) -> EventEnvelope {
    match LwaClient::from_config(&config.grant) {
        Ok(client) => grant::handle(&client, directive).await,
        Err(e) => {
            tracing::error!(error = %e, "cannot accept grant");
            grant::failure(directive, "Skill credentials not configured")
        }
    }
}

/// Bridge bound to the process configuration
#[derive(Debug, Clone)]
pub struct Bridge {
    config: Arc<Config>,
}

impl Bridge {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse and answer a raw request body
    ///
    /// A hub client is built per request so the directive's bearer token can
    /// select credentials and host.
    ///
    /// # Errors
    ///
    /// Returns error if the request is malformed, the namespace is unsupported,
    /// or the hub endpoint cannot be resolved
    pub async fn handle(&self, body: Value) -> Result<EventEnvelope> {
        let directive = parse_request(body)?;
        let hub = DomoticzClient::connect(&self.config.hub, directive.bearer_token())?;
        handle(&hub, &self.config, &directive).await
    }
}
