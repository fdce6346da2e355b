//! Domo Bridge - voice assistant smart home bridge for Domoticz
//!
//! Translates smart home directives into hub API calls and the hub's answers
//! back into events:
//! - Discovery: hub device list to endpoint descriptors
//! - Control and state reports: directive to hub writes and reads
//! - Authorization grant exchange
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          HTTP (POST /alexa)  │  CLI                  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Bridge                           │
//! │   Discovery  │  Dispatcher  │  Grant  │  Responses  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Domoticz hub (json.htm)                 │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod alexa;
pub mod api;
pub mod bridge;
pub mod config;
pub mod cookie;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod grant;
pub mod hub;

pub use bridge::Bridge;
pub use config::Config;
pub use error::{Error, Result};
