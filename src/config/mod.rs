//! Configuration management for the bridge

pub mod file;

use secrecy::SecretString;

use crate::alexa::TemperatureScale;
use crate::{Error, Result};

use file::BridgeConfigFile;

/// Default Login with Amazon token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";

/// Bridge configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Hub connection
    pub hub: HubConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// Authorization grant exchange
    pub grant: GrantConfig,
}

/// Hub connection configuration
///
/// These are the static defaults; a JWT bearer token on an inbound directive
/// may redirect a single request to another host (see `hub::credentials`).
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// "http" or "https"
    pub protocol: String,

    pub host: String,

    pub port: u16,

    /// Basic auth username (empty = no basic auth)
    pub username: String,

    pub password: SecretString,

    /// Pinned hub release string; takes priority over what the hub reports
    pub version: Option<String>,

    /// Scale used when reporting and writing temperatures
    pub temperature_scale: TemperatureScale,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            protocol: "https".to_string(),
            host: "localhost".to_string(),
            port: 443,
            username: String::new(),
            password: SecretString::from(String::new()),
            version: None,
            temperature_scale: TemperatureScale::Celsius,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// API key for the directive endpoint (from `DOMO_BRIDGE_API_KEY` env)
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 18800,
            api_key: None,
        }
    }
}

/// Login with Amazon credentials for `AcceptGrant`
#[derive(Debug, Clone)]
pub struct GrantConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub token_url: String,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the optional TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid (e.g. unknown temperature scale)
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn from_sources<F>(fc: BridgeConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hub_default = HubConfig::default();

        let protocol = env("DOMOTICZ_PROTOCOL")
            .or(fc.hub.protocol)
            .unwrap_or(hub_default.protocol)
            .to_lowercase();
        if protocol != "http" && protocol != "https" {
            return Err(Error::Config(format!(
                "hub protocol must be http or https, got {protocol}"
            )));
        }

        let temperature_scale = match env("DOMOTICZ_TEMPERATURE_SCALE").or(fc.hub.temperature_scale) {
            Some(raw) => raw.parse()?,
            None => hub_default.temperature_scale,
        };

        let hub = HubConfig {
            protocol,
            host: env("DOMOTICZ_HOST")
                .or(fc.hub.host)
                .unwrap_or(hub_default.host),
            port: env("DOMOTICZ_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.hub.port)
                .unwrap_or(hub_default.port),
            username: env("DOMOTICZ_USERNAME")
                .or(fc.hub.username)
                .unwrap_or_default(),
            password: SecretString::from(
                env("DOMOTICZ_PASSWORD")
                    .or(fc.hub.password)
                    .unwrap_or_default(),
            ),
            version: env("DOMOTICZ_VERSION").or(fc.hub.version),
            temperature_scale,
        };

        let server_default = ServerConfig::default();
        let server = ServerConfig {
            port: env("DOMO_BRIDGE_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(server_default.port),
            api_key: env("DOMO_BRIDGE_API_KEY").or(fc.server.api_key),
        };

        let grant = GrantConfig {
            client_id: env("ALEXA_CLIENT_ID").or(fc.grant.client_id),
            client_secret: env("ALEXA_CLIENT_SECRET")
                .or(fc.grant.client_secret)
                .map(SecretString::from),
            token_url: env("ALEXA_TOKEN_URL")
                .or(fc.grant.token_url)
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        };

        Ok(Self { hub, server, grant })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::file::{BridgeConfigFile, HubFileConfig};
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(BridgeConfigFile::default(), lookup(&[])).unwrap();
        assert_eq!(config.hub.protocol, "https");
        assert_eq!(config.hub.host, "localhost");
        assert_eq!(config.hub.port, 443);
        assert_eq!(config.hub.temperature_scale, TemperatureScale::Celsius);
        assert_eq!(config.server.port, 18800);
        assert_eq!(config.grant.token_url, DEFAULT_TOKEN_URL);
    }

    #[test]
    fn test_env_overrides_file() {
        let fc = BridgeConfigFile {
            hub: HubFileConfig {
                host: Some("file-host".to_string()),
                port: Some(8080),
                password: Some("file-pass".to_string()),
                ..HubFileConfig::default()
            },
            ..BridgeConfigFile::default()
        };
        let config = Config::from_sources(
            fc,
            lookup(&[("DOMOTICZ_HOST", "env-host"), ("DOMOTICZ_PROTOCOL", "HTTP")]),
        )
        .unwrap();

        assert_eq!(config.hub.host, "env-host");
        assert_eq!(config.hub.port, 8080);
        assert_eq!(config.hub.protocol, "http");
        assert_eq!(config.hub.password.expose_secret(), "file-pass");
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let config =
            Config::from_sources(BridgeConfigFile::default(), lookup(&[("DOMOTICZ_PORT", "nope")]))
                .unwrap();
        assert_eq!(config.hub.port, 443);
    }

    #[test]
    fn test_rejects_unknown_protocol() {
        let result =
            Config::from_sources(BridgeConfigFile::default(), lookup(&[("DOMOTICZ_PROTOCOL", "ftp")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_temperature_scale() {
        let config = Config::from_sources(
            BridgeConfigFile::default(),
            lookup(&[("DOMOTICZ_TEMPERATURE_SCALE", "fahrenheit")]),
        )
        .unwrap();
        assert_eq!(config.hub.temperature_scale, TemperatureScale::Fahrenheit);

        let bad = Config::from_sources(
            BridgeConfigFile::default(),
            lookup(&[("DOMOTICZ_TEMPERATURE_SCALE", "rankine")]),
        );
        assert!(bad.is_err());
    }
}
