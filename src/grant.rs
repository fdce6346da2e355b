//! `Alexa.Authorization.AcceptGrant` handling
//!
//! The grant code is exchanged with Login with Amazon so the skill could send
//! events later. Tokens are not stored; only their lifetime is logged.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::alexa::{Directive, EventEnvelope, ResponseBuilder, ns};
use crate::config::GrantConfig;
use crate::{Error, Result};

/// Error type sent when the exchange fails
pub const ACCEPT_GRANT_FAILED: &str = "ACCEPT_GRANT_FAILED";

/// Tokens returned by the authorization server
#[derive(Debug)]
pub struct GrantTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
}

/// Exchanges an authorization code for tokens
#[async_trait]
pub trait GrantExchanger: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<GrantTokens>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Login with Amazon token endpoint client
#[derive(Debug, Clone)]
pub struct LwaClient {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl LwaClient {
    /// Create a client from the grant configuration
    ///
    /// # Errors
    ///
    /// Returns error if the client id or secret is not configured
    pub fn from_config(config: &GrantConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Grant("ALEXA_CLIENT_ID not configured".to_string()))?;
        let client_secret = config
            .client_secret
            .clone()
            .ok_or_else(|| Error::Grant("ALEXA_CLIENT_SECRET not configured".to_string()))?;

        Ok(Self {
            client: Client::new(),
            token_url: config.token_url.clone(),
            client_id,
            client_secret,
        })
    }
}

#[async_trait]
impl GrantExchanger for LwaClient {
    async fn exchange(&self, code: &str) -> Result<GrantTokens> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Grant(format!("LWA token error: {status} - {body}")));
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(GrantTokens {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: tokens.refresh_token.map(SecretString::from),
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        })
    }
}

/// `ErrorResponse` for a failed grant
#[must_use]
pub fn failure(directive: &Directive, message: &str) -> EventEnvelope {
    ResponseBuilder::new(&directive.header).error(
        ns::AUTHORIZATION,
        None,
        ACCEPT_GRANT_FAILED,
        message,
    )
}

/// Answer an `AcceptGrant` directive
pub async fn handle<G: GrantExchanger + ?Sized>(exchanger: &G, directive: &Directive) -> EventEnvelope {
    let Some(code) = directive
        .payload
        .pointer("/grant/code")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
    else {
        tracing::warn!("AcceptGrant without authorization code");
        return failure(directive, "Missing authorization code");
    };

    match exchanger.exchange(code).await {
        Ok(tokens) => {
            tracing::info!(
                expires_in = ?tokens.expires_in,
                token_type = ?tokens.token_type,
                has_refresh_token = tokens.refresh_token.is_some(),
                "authorization grant accepted"
            );
            ResponseBuilder::new(&directive.header).event(
                ns::AUTHORIZATION,
                "AcceptGrant.Response",
                None,
                json!({}),
                None,
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "authorization code exchange failed");
            failure(directive, "Failed to exchange authorization code")
        }
    }
}
