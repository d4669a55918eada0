//! # NOTT Control Library
//!
//! Control layer for the NOTT instrument's delay lines and beam shutters,
//! driven over an OPC UA gateway to the instrument PLC. The crate's job is
//! the device command/poll state machine: issue a motion or actuation
//! command, detect completion by repeatedly sampling the device's
//! status/state pair, bound the wait, and release the remote session on
//! every exit path.
//!
//! ## Crate Structure
//!
//! - **`addressing`**: Pure mapping from logical device identifiers to
//!   protocol-level node paths.
//! - **`config`**: The one required configuration value (the server
//!   address), loaded once at a composition root.
//! - **`controller`**: `NottController`, the composition root handing out
//!   configured devices.
//! - **`delay_line`**: Relative/absolute moves polled to completion, and
//!   position reads.
//! - **`error`**: `ControlError`, keeping remote rejection and polling
//!   timeout distinguishable.
//! - **`poll`**: The sleep/sample/check completion poller.
//! - **`session`**: The consumed protocol surface (`Connector`,
//!   `OpcSession`) and scoped session acquisition.
//! - **`shutter`**: Fire-and-return shutter commands.
//! - **`sim`**: Scripted in-process automation server for tests and demos.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nott_control::sim::SimServer;
//! use nott_control::NottController;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> nott_control::Result<()> {
//!     // In a deployment the endpoint comes from ControlConfig::load,
//!     // read exactly once, here.
//!     let sim = SimServer::new();
//!     let controller = NottController::new(Arc::new(sim.connector()), SimServer::endpoint());
//!
//!     let line = controller.delay_line("DL_Servo_1")?;
//!     line.move_relative(0.5, 1.0).await?;
//!     println!("position: {}", line.position().await?);
//!
//!     controller.shutter("1")?.close().await?;
//!     Ok(())
//! }
//! ```

pub mod addressing;
pub mod config;
pub mod controller;
pub mod delay_line;
pub mod error;
pub mod poll;
pub mod session;
pub mod shutter;
pub mod sim;

pub use addressing::{DeviceKind, DeviceRef};
pub use config::{ControlConfig, Endpoint};
pub use controller::NottController;
pub use delay_line::{DelayLine, POSITION_SCALE};
pub use error::{ControlError, Result};
pub use poll::{wait_until, CompletionPolicy, StatusSample, DEFAULT_POLL_INTERVAL};
pub use session::{with_session, ConnectionHandle, Connector, OpcSession, OpcValue};
pub use shutter::Shutter;
