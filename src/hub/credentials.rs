//! Hub credential resolution
//!
//! A directive may carry a hub-issued JWT as its bearer token. When it does,
//! the token is forwarded as `Authorization: Bearer` and its issuer decides
//! which hub to talk to. Otherwise the static basic-auth credentials from the
//! configuration are used.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::config::HubConfig;
use crate::{Error, Result};

/// Issuer host that means "use the configured hub"
const LOCAL_ISSUER_HOST: &str = "domoticz.local";

/// How requests to the hub authenticate
#[derive(Debug, Clone)]
pub enum HubAuth {
    Basic {
        username: String,
        password: SecretString,
    },
    Bearer(SecretString),
    None,
}

/// Resolved hub location and credentials for one request
#[derive(Debug, Clone)]
pub struct HubEndpoint {
    pub base_url: Url,
    pub auth: HubAuth,
}

#[derive(Debug, Deserialize)]
struct HubClaims {
    iss: Option<String>,
    exp: Option<i64>,
}

/// Whether a bearer token looks like a hub-issued JWT
#[must_use]
pub fn is_hub_jwt(token: &str) -> bool {
    token.starts_with("eyJ")
}

/// Resolve where and how to reach the hub for a request
///
/// # Errors
///
/// Returns error if the configured hub address does not form a valid URL
pub fn resolve(config: &HubConfig, bearer: Option<&str>) -> Result<HubEndpoint> {
    let mut base_url = base_url(&config.protocol, &config.host, config.port)?;

    let auth = match bearer.filter(|token| is_hub_jwt(token)) {
        Some(token) => {
            if let Some(issuer) = issuer_url(token) {
                base_url = issuer;
            }
            HubAuth::Bearer(SecretString::from(token.to_string()))
        }
        None if config.username.is_empty() => HubAuth::None,
        None => HubAuth::Basic {
            username: config.username.clone(),
            password: config.password.clone(),
        },
    };

    Ok(HubEndpoint { base_url, auth })
}

fn base_url(protocol: &str, host: &str, port: u16) -> Result<Url> {
    Url::parse(&format!("{protocol}://{host}:{port}/"))
        .map_err(|e| Error::Config(format!("invalid hub address {host}:{port}: {e}")))
}

/// Hub URL named by the token issuer, unless it points at the local hub
fn issuer_url(token: &str) -> Option<Url> {
    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode hub token, using configured hub");
            return None;
        }
    };

    if let Some(exp) = claims.exp {
        let remaining = exp - chrono::Utc::now().timestamp();
        tracing::debug!(expires_in_secs = remaining, "hub token lifetime");
    }

    let issuer = Url::parse(claims.iss.as_deref()?).ok()?;
    let host = issuer.host_str()?;
    if host == LOCAL_ISSUER_HOST {
        return None;
    }
    let port = issuer.port_or_known_default()?;

    tracing::debug!(host = %host, port, "using hub address from token issuer");
    base_url(issuer.scheme(), host, port).ok()
}

/// Read the claims without checking the signature; the hub verifies the token
fn decode_claims(token: &str) -> std::result::Result<HubClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<HubClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
}
