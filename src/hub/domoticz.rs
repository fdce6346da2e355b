//! Domoticz JSON API client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::credentials::{self, HubAuth};
use super::{DeviceListing, HubClient, HubDevice, Rgb, SceneCommand, SwitchCommand};
use crate::config::HubConfig;
use crate::{Error, Result};

/// Client for a single Domoticz hub
#[derive(Debug, Clone)]
pub struct DomoticzClient {
    /// HTTP client
    client: Client,
    /// Hub root, e.g. `http://192.168.1.10:8080/`
    base_url: Url,
    auth: HubAuth,
}

/// Envelope every `json.htm` command answers with
#[derive(Debug, Deserialize)]
struct HubReply {
    status: String,
    #[serde(default)]
    result: Option<Vec<HubDevice>>,
    #[serde(default)]
    app_version: Option<String>,
}

impl DomoticzClient {
    /// Build a client for one request, resolving credentials from the caller's token
    ///
    /// # Errors
    ///
    /// Returns error if the hub address is not a valid URL
    pub fn connect(config: &HubConfig, bearer: Option<&str>) -> Result<Self> {
        let endpoint = credentials::resolve(config, bearer)?;
        Ok(Self {
            client: Client::new(),
            base_url: endpoint.base_url,
            auth: endpoint.auth,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Prepare a `json.htm` command request with credentials attached
    fn request(&self, params: &[(&str, &str)]) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join("json.htm")
            .map_err(|e| Error::Config(format!("invalid hub url: {e}")))?;

        let mut query = vec![("type", "command")];
        query.extend_from_slice(params);

        let req = self.client.get(url).query(&query);
        Ok(match &self.auth {
            HubAuth::Basic { username, password } => {
                req.basic_auth(username, Some(password.expose_secret()))
            }
            HubAuth::Bearer(token) => req.bearer_auth(token.expose_secret()),
            HubAuth::None => req,
        })
    }

    /// Run a command and check both HTTP and hub status
    async fn command(&self, params: &[(&str, &str)]) -> Result<HubReply> {
        let param = params
            .iter()
            .find(|(key, _)| *key == "param")
            .map_or("", |(_, value)| *value);
        tracing::debug!(param, host = ?self.base_url.host_str(), "hub request");

        let response = self.request(params)?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(Error::Hub(format!("Domoticz API error: {status} - {snippet}")));
        }

        let body = response.text().await?;
        let reply: HubReply = serde_json::from_str(&body)
            .map_err(|e| Error::Hub(format!("unparseable Domoticz response: {e}")))?;

        if reply.status != "OK" {
            tracing::warn!(param, status = %reply.status, "hub rejected command");
            return Err(Error::HubStatus(reply.status));
        }

        Ok(reply)
    }
}

#[async_trait]
impl HubClient for DomoticzClient {
    async fn list_devices(&self) -> Result<DeviceListing> {
        let reply = self
            .command(&[("param", "getdevices"), ("filter", "all"), ("used", "true")])
            .await?;

        Ok(DeviceListing {
            devices: reply.result.unwrap_or_default(),
            version: reply.app_version,
        })
    }

    async fn get_device(&self, id: &str) -> Result<HubDevice> {
        let reply = self.command(&[("param", "getdevices"), ("rid", id)]).await?;

        reply
            .result
            .and_then(|devices| devices.into_iter().next())
            .ok_or_else(|| Error::Hub(format!("device {id} not found")))
    }

    async fn write_switch(&self, id: &str, command: SwitchCommand) -> Result<()> {
        self.command(&[
            ("param", "switchlight"),
            ("idx", id),
            ("switchcmd", command.as_str()),
        ])
        .await?;
        Ok(())
    }

    async fn write_dim_level(&self, id: &str, level: u32) -> Result<()> {
        let level = level.to_string();
        self.command(&[
            ("param", "switchlight"),
            ("idx", id),
            ("switchcmd", "Set Level"),
            ("level", &level),
        ])
        .await?;
        Ok(())
    }

    async fn write_color(&self, id: &str, color: Rgb) -> Result<()> {
        // No brightness parameter: the hub keeps the current level
        let color = json!({
            "m": 3,
            "t": 0,
            "r": color.r,
            "g": color.g,
            "b": color.b,
            "cw": 0,
            "ww": 0
        })
        .to_string();
        self.command(&[
            ("param", "setcolbrightnessvalue"),
            ("idx", id),
            ("color", &color),
        ])
        .await?;
        Ok(())
    }

    async fn write_kelvin(&self, id: &str, kelvin: u32) -> Result<()> {
        let kelvin = kelvin.to_string();
        self.command(&[("param", "setkelvinlevel"), ("idx", id), ("kelvin", &kelvin)])
            .await?;
        Ok(())
    }

    async fn write_scene(&self, id: &str, command: SceneCommand) -> Result<()> {
        self.command(&[
            ("param", "switchscene"),
            ("idx", id),
            ("switchcmd", command.as_str()),
        ])
        .await?;
        Ok(())
    }

    async fn write_setpoint(&self, id: &str, value: f64) -> Result<()> {
        let value = value.to_string();
        self.command(&[
            ("param", "udevice"),
            ("idx", id),
            ("nvalue", "0"),
            ("svalue", &value),
        ])
        .await?;
        Ok(())
    }
}
