//! Setpoint/temperature pairing
//!
//! The hub has no relation between a setpoint device and the sensor that
//! measures the same room. They are paired by name instead: a setpoint named
//! `Lounge Setpoint` belongs to a sensor named `Lounge Temperature`.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::hub::HubDevice;

static SETPOINT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+setpoint$").expect("valid regex"));

const TEMPERATURE_SUFFIX: &str = " Temperature";

/// Result of the pairing pass over one device snapshot
#[derive(Debug, Default)]
pub struct Pairings {
    /// Temperature device id → setpoint device id
    setpoint_for: HashMap<String, String>,
    /// Setpoint devices folded into a temperature endpoint
    suppressed: HashSet<String>,
}

impl Pairings {
    /// Pair every plan-eligible setpoint with its temperature sensor
    ///
    /// The first setpoint (in input order) to name a sensor claims it. A later
    /// setpoint matching an already claimed sensor stays a standalone
    /// thermostat.
    #[must_use]
    pub fn compute(devices: &[HubDevice]) -> Self {
        let mut pairings = Self::default();

        for setpoint in devices
            .iter()
            .filter(|d| d.device_type == "Thermostat" && d.in_plan())
        {
            let Some(sensor) = temperature_partner(setpoint, devices) else {
                continue;
            };

            if let Some(claimed_by) = pairings.setpoint_for.get(&sensor.id) {
                tracing::warn!(
                    setpoint = %setpoint.id,
                    sensor = %sensor.id,
                    claimed_by = %claimed_by,
                    "temperature sensor already paired, leaving setpoint standalone"
                );
                continue;
            }

            tracing::debug!(setpoint = %setpoint.id, sensor = %sensor.id, "paired thermostat");
            pairings
                .setpoint_for
                .insert(sensor.id.clone(), setpoint.id.clone());
            pairings.suppressed.insert(setpoint.id.clone());
        }

        pairings
    }

    /// Setpoint paired with a temperature device
    #[must_use]
    pub fn setpoint_for(&self, temperature_id: &str) -> Option<&str> {
        self.setpoint_for.get(temperature_id).map(String::as_str)
    }

    /// Whether a setpoint device is hidden behind its temperature sensor
    #[must_use]
    pub fn is_suppressed(&self, id: &str) -> bool {
        self.suppressed.contains(id)
    }
}

/// Plan-eligible temperature device named after a setpoint device
#[must_use]
pub fn temperature_partner<'a>(setpoint: &HubDevice, devices: &'a [HubDevice]) -> Option<&'a HubDevice> {
    let base = SETPOINT_SUFFIX.replace(&setpoint.name, "");
    let wanted = format!("{base}{TEMPERATURE_SUFFIX}");

    devices
        .iter()
        .find(|d| d.name == wanted && d.device_type.starts_with("Temp") && d.in_plan())
}
