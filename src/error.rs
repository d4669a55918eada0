//! Error types for the control layer.
//!
//! `ControlError` keeps the failure kinds a caller genuinely needs to tell
//! apart. The split that matters operationally is `RemoteCall` versus
//! `Timeout`: the former means the controller rejected the command, the
//! latter means the command was accepted but the device never reported
//! completion within the polling budget, so the mechanics may still be
//! moving. Configuration and connection problems are surfaced before any
//! command is issued.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by delay line and shutter operations.
#[derive(Error, Debug)]
pub enum ControlError {
    /// The configuration source could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The configuration parsed but is semantically unusable.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A logical device identifier failed validation. Raised before any
    /// connection is opened.
    #[error("Invalid device identifier {id:?}: {reason}")]
    InvalidDevice {
        /// The identifier as supplied by the caller.
        id: String,
        /// What the identifier was expected to look like.
        reason: &'static str,
    },

    /// A session to the controller endpoint could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The controller rejected a remote procedure call or a node read
    /// failed. The session is still released.
    #[error("Remote call error: {0}")]
    RemoteCall(String),

    /// The polling deadline elapsed before the device reported completion.
    ///
    /// Distinct from [`ControlError::RemoteCall`]: the command was accepted,
    /// and the physical device may still be in motion after this error is
    /// returned. No stop command is issued and the call is not retried.
    #[error("Timed out after {waited:?} waiting for target status")]
    Timeout {
        /// Wall time spent polling before giving up.
        waited: Duration,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ControlError>;
