//! Selector switch level names

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::alexa::capability::ModeDeclaration;

/// Level step between consecutive selector entries
pub const LEVEL_STEP: u32 = 10;

/// Spoken aliases for modes voice recognition tends to mishear
const ALIASES: &[(&str, &str)] = &[("Allowed out", "Aloud out")];

/// Decode the hub's `LevelNames` field into mode names
///
/// The hub sends base64 of a pipe-delimited list; anything that does not
/// decode to UTF-8 is split as-is.
#[must_use]
pub fn decode_level_names(raw: &str) -> Vec<String> {
    let decoded = STANDARD
        .decode(raw.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string());

    decoded.split('|').map(ToString::to_string).collect()
}

/// Wire value of the mode at `index`
#[must_use]
pub fn mode_value(index: usize) -> String {
    format!("Level.{}", index * LEVEL_STEP as usize)
}

/// Mode declarations in level order, with aliases attached
#[must_use]
pub fn mode_declarations(modes: &[String]) -> Vec<ModeDeclaration> {
    modes
        .iter()
        .enumerate()
        .map(|(index, mode)| {
            let mut names = vec![mode.clone()];
            names.extend(
                ALIASES
                    .iter()
                    .filter(|(name, _)| name == mode)
                    .map(|(_, alias)| (*alias).to_string()),
            );
            ModeDeclaration {
                value: mode_value(index),
                names,
            }
        })
        .collect()
}

/// Mode controller instance for a device name, e.g. `Living Room` → `LivingRoom.Mode`
#[must_use]
pub fn instance_name(device_name: &str) -> String {
    let stem: String = device_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("{stem}.Mode")
}
