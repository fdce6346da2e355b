//! Shared test utilities

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domo_bridge::alexa::Directive;
use domo_bridge::hub::{DeviceListing, HubClient, HubDevice, Rgb, SceneCommand, SwitchCommand};
use domo_bridge::{Error, Result};
use serde_json::{Value, json};

/// A write the bridge sent to the hub
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Switch(String, SwitchCommand),
    DimLevel(String, u32),
    Color(String, Rgb),
    Kelvin(String, u32),
    Scene(String, SceneCommand),
    Setpoint(String, f64),
}

/// In-memory hub that records writes
#[derive(Default)]
pub struct MockHub {
    devices: Vec<HubDevice>,
    version: Option<String>,
    writes: Mutex<Vec<Write>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockHub {
    #[must_use]
    pub fn new(devices: Vec<HubDevice>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Writes received so far, in order
    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, write: Write) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Hub("connection refused".to_string()));
        }
        self.writes.lock().unwrap().push(write);
        Ok(())
    }
}

#[async_trait]
impl HubClient for MockHub {
    async fn list_devices(&self) -> Result<DeviceListing> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Hub("connection refused".to_string()));
        }
        Ok(DeviceListing {
            devices: self.devices.clone(),
            version: self.version.clone(),
        })
    }

    async fn get_device(&self, id: &str) -> Result<HubDevice> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Hub("connection refused".to_string()));
        }
        self.devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| Error::HubStatus("ERR".to_string()))
    }

    async fn write_switch(&self, id: &str, command: SwitchCommand) -> Result<()> {
        self.record(Write::Switch(id.to_string(), command))
    }

    async fn write_dim_level(&self, id: &str, level: u32) -> Result<()> {
        self.record(Write::DimLevel(id.to_string(), level))
    }

    async fn write_color(&self, id: &str, color: Rgb) -> Result<()> {
        self.record(Write::Color(id.to_string(), color))
    }

    async fn write_kelvin(&self, id: &str, kelvin: u32) -> Result<()> {
        self.record(Write::Kelvin(id.to_string(), kelvin))
    }

    async fn write_scene(&self, id: &str, command: SceneCommand) -> Result<()> {
        self.record(Write::Scene(id.to_string(), command))
    }

    async fn write_setpoint(&self, id: &str, value: f64) -> Result<()> {
        self.record(Write::Setpoint(id.to_string(), value))
    }
}

/// Device placed in a room plan
#[must_use]
pub fn device(id: &str, name: &str, device_type: &str) -> HubDevice {
    HubDevice {
        id: id.to_string(),
        name: name.to_string(),
        device_type: device_type.to_string(),
        plan_id: Some("1".to_string()),
        ..HubDevice::default()
    }
}

/// Build a v3 directive addressed to an endpoint
#[must_use]
pub fn directive(namespace: &str, name: &str, endpoint_id: &str, cookie: Value, payload: Value) -> Directive {
    serde_json::from_value(json!({
        "header": {
            "namespace": namespace,
            "name": name,
            "payloadVersion": "3",
            "messageId": "msg-1",
            "correlationToken": "corr-1"
        },
        "endpoint": {
            "endpointId": endpoint_id,
            "cookie": cookie,
            "scope": { "type": "BearerToken", "token": "user-token" }
        },
        "payload": payload
    }))
    .expect("valid directive")
}

/// Build a discovery directive
#[must_use]
pub fn discover_directive() -> Directive {
    serde_json::from_value(json!({
        "header": {
            "namespace": "Alexa.Discovery",
            "name": "Discover",
            "payloadVersion": "3",
            "messageId": "discover-1"
        },
        "payload": { "scope": { "type": "BearerToken", "token": "user-token" } }
    }))
    .expect("valid directive")
}
