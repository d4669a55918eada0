//! Logical-to-protocol device addressing.
//!
//! The PLC exposes every device under the `MAIN` program block. Motors are
//! addressed directly by their logical name (`DL_Servo_1` lives at
//! `MAIN.DL_Servo_1`); shutters live in a dedicated subtree and are
//! addressed by number (`3` resolves to `MAIN.nott_ics.Shutters.NSH3`).
//! Resolution is pure string work with no I/O, so malformed identifiers are
//! rejected before any connection is opened.

use crate::error::{ControlError, Result};
use std::fmt;

/// Program block prefix shared by every addressable device.
const NAMESPACE_PREFIX: &str = "MAIN.";
/// Subtree holding the shutter function blocks.
const SHUTTER_SUBTREE: &str = "nott_ics.Shutters.NSH";

/// Status word sub-node, e.g. `MAIN.DL_Servo_1.stat.sStatus`.
pub(crate) const STATUS_SUFFIX: &str = ".stat.sStatus";
/// Operational state sub-node.
pub(crate) const STATE_SUFFIX: &str = ".stat.sState";
/// Actual position sub-node, raw controller units.
pub(crate) const POSITION_SUFFIX: &str = ".stat.lrPosActual";

/// The two kinds of addressable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// A delay line servo motor.
    Motor,
    /// A beam shutter.
    Shutter,
}

/// A resolved protocol-level addressing path for one physical device.
///
/// Construction validates the logical identifier; a `DeviceRef` therefore
/// always names a well-formed path. Resolution is deterministic: equal
/// inputs produce equal refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    path: String,
    kind: DeviceKind,
}

impl DeviceRef {
    /// Resolves a logical identifier to its addressing path.
    ///
    /// Motor identifiers are restricted to `[A-Za-z0-9_]`; shutter
    /// identifiers must be numeric. Anything else fails with
    /// [`ControlError::InvalidDevice`].
    pub fn resolve(logical_id: &str, kind: DeviceKind) -> Result<Self> {
        let path = match kind {
            DeviceKind::Motor => {
                validate(
                    logical_id,
                    |c| c.is_ascii_alphanumeric() || c == '_',
                    "expected [A-Za-z0-9_]",
                )?;
                format!("{}{}", NAMESPACE_PREFIX, logical_id)
            }
            DeviceKind::Shutter => {
                validate(logical_id, |c| c.is_ascii_digit(), "expected a numeric shutter id")?;
                format!("{}{}{}", NAMESPACE_PREFIX, SHUTTER_SUBTREE, logical_id)
            }
        };
        Ok(Self { path, kind })
    }

    /// Shorthand for `resolve(id, DeviceKind::Motor)`.
    pub fn motor(logical_id: &str) -> Result<Self> {
        Self::resolve(logical_id, DeviceKind::Motor)
    }

    /// Shorthand for `resolve(id, DeviceKind::Shutter)`.
    pub fn shutter(logical_id: &str) -> Result<Self> {
        Self::resolve(logical_id, DeviceKind::Shutter)
    }

    /// The resolved addressing path, e.g. `MAIN.DL_Servo_1`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Which kind of device this ref addresses.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Path of the status word sub-node.
    pub fn status_node(&self) -> String {
        format!("{}{}", self.path, STATUS_SUFFIX)
    }

    /// Path of the operational state sub-node.
    pub fn state_node(&self) -> String {
        format!("{}{}", self.path, STATE_SUFFIX)
    }

    /// Path of the actual-position sub-node.
    pub fn position_node(&self) -> String {
        format!("{}{}", self.path, POSITION_SUFFIX)
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

fn validate(id: &str, allowed: fn(char) -> bool, reason: &'static str) -> Result<()> {
    if id.is_empty() || !id.chars().all(allowed) {
        return Err(ControlError::InvalidDevice {
            id: id.to_string(),
            reason,
        });
    }
    Ok(())
}
