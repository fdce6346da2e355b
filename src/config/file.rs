//! TOML configuration file loading
//!
//! Supports `~/.config/domo-bridge/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfigFile {
    /// Hub connection settings
    #[serde(default)]
    pub hub: HubFileConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Authorization grant settings
    #[serde(default)]
    pub grant: GrantFileConfig,
}

/// Hub connection configuration
#[derive(Debug, Default, Deserialize)]
pub struct HubFileConfig {
    /// "http" or "https"
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Hub release string (e.g. "2023.2"), overrides what the hub reports
    pub version: Option<String>,

    /// "CELSIUS" or "FAHRENHEIT"
    pub temperature_scale: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// HTTP server port
    pub port: Option<u16>,

    /// Key required on `Authorization: Bearer` for the directive endpoint
    pub api_key: Option<String>,
}

/// Login with Amazon client credentials
#[derive(Debug, Default, Deserialize)]
pub struct GrantFileConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: Option<String>,
}

/// Load the TOML config file from `DOMO_BRIDGE_CONFIG` or the standard path
///
/// Returns `BridgeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> BridgeConfigFile {
    let path = std::env::var("DOMO_BRIDGE_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    let Some(path) = path else {
        return BridgeConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a config file from an explicit path
///
/// A missing file yields defaults; read and parse failures are logged and
/// also fall back to defaults.
pub fn load_config_file_from(path: &Path) -> BridgeConfigFile {
    if !path.exists() {
        return BridgeConfigFile::default();
    }

    match read_config_file(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            BridgeConfigFile::default()
        }
    }
}

/// Read and parse a config file
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file cannot be read and [`crate::Error::Toml`] if it
/// is not valid TOML for the schema
pub fn read_config_file(path: &Path) -> Result<BridgeConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/domo-bridge/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("domo-bridge").join("config.toml"))
}
