//! Scripted simulator for the automation server
//!
//! This module provides an in-process stand-in for the OPC UA gateway: a
//! [`SimConnector`] the application code connects through, and a
//! [`SimServer`] handle the test keeps to script device behavior and
//! assert on what happened. It backs the crate's own test suite and the
//! demo tool, and is exported so downstream code can test against it.
//!
//! # Architecture
//!
//! All parties share one piece of state behind a mutex:
//! - `SimConnector` (given to application): implements [`Connector`] and
//!   hands out sessions over the shared state
//! - `SimServer` (kept in test): scripts status transitions, injects
//!   failures, and exposes counters for connects, disconnects and polls
//!
//! # Example
//!
//! ```rust,ignore
//! use nott_control::sim::SimServer;
//! use nott_control::NottController;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_move_completes() {
//!     let sim = SimServer::new();
//!     sim.script_statuses([("MOVING", "OPERATIONAL"), ("STANDING", "OPERATIONAL")]);
//!
//!     let controller = NottController::new(Arc::new(sim.connector()), SimServer::endpoint());
//!     controller.delay_line("DL_Servo_1").unwrap().move_relative(0.5, 1.0).await.unwrap();
//!
//!     assert_eq!(sim.poll_count(), 2);
//!     assert_eq!(sim.disconnect_count(), 1);
//! }
//! ```

use crate::addressing::{POSITION_SUFFIX, STATE_SUFFIX, STATUS_SUFFIX};
use crate::config::Endpoint;
use crate::error::{ControlError, Result};
use crate::poll::StatusSample;
use crate::session::{Connector, OpcSession, OpcValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One remote procedure invocation recorded by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Node path the procedure was invoked on.
    pub node_path: String,
    /// Procedure name, e.g. `RPC_MoveRel`.
    pub method: String,
    /// Positional arguments as received.
    pub args: Vec<OpcValue>,
}

#[derive(Debug, Default)]
struct SimState {
    /// Scripted (status, state) steps; one is served per poll batch, and
    /// the final step repeats forever. Empty means already settled.
    status_script: Vec<StatusSample>,
    script_cursor: usize,
    /// Raw position served for the actual-position node, controller units.
    position: f64,
    calls: Vec<RecordedCall>,
    connects: usize,
    disconnects: usize,
    polls: usize,
    fail_connect: Option<String>,
    fail_methods: HashMap<String, String>,
    fail_disconnect: bool,
}

impl SimState {
    fn current_sample(&self) -> StatusSample {
        self.status_script
            .get(self.script_cursor)
            .or_else(|| self.status_script.last())
            .cloned()
            .unwrap_or_else(|| StatusSample::new("STANDING", "OPERATIONAL"))
    }

    fn advance_script(&mut self) {
        if self.script_cursor + 1 < self.status_script.len() {
            self.script_cursor += 1;
        }
    }

    fn serve(&self, node_path: &str, sample: &StatusSample) -> Result<OpcValue> {
        if node_path.ends_with(STATUS_SUFFIX) {
            Ok(OpcValue::Text(sample.status.clone()))
        } else if node_path.ends_with(STATE_SUFFIX) {
            Ok(OpcValue::Text(sample.state.clone()))
        } else if node_path.ends_with(POSITION_SUFFIX) {
            Ok(OpcValue::Double(self.position))
        } else {
            Err(ControlError::RemoteCall(format!(
                "simulator has no node at {:?}",
                node_path
            )))
        }
    }
}

// =============================================================================
// Test-facing handle
// =============================================================================

/// Test-facing handle for scripting the simulated server and inspecting
/// what the code under test did to it.
#[derive(Clone, Default)]
pub struct SimServer {
    state: Arc<Mutex<SimState>>,
}

impl SimServer {
    /// A fresh simulator: no script (devices report settled immediately),
    /// position zero, nothing failing.
    pub fn new() -> Self {
        Self::default()
    }

    /// The endpoint the simulator nominally listens on. Any endpoint is
    /// accepted by [`SimConnector`]; this one exists so callers do not
    /// have to invent an address.
    pub fn endpoint() -> Endpoint {
        Endpoint::new("opc.tcp://simulator.local:4840")
    }

    /// A connector handing out sessions backed by this simulator.
    pub fn connector(&self) -> SimConnector {
        SimConnector {
            state: self.state.clone(),
        }
    }

    /// Scripts the (status, state) sequence served to polls, one step per
    /// poll batch. The final step repeats forever.
    pub fn script_statuses<'a, I>(&self, steps: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut state = self.state.lock();
        state.status_script = steps
            .into_iter()
            .map(|(status, device_state)| StatusSample::new(status, device_state))
            .collect();
        state.script_cursor = 0;
    }

    /// Sets the raw position served for actual-position reads.
    pub fn set_position(&self, raw: f64) {
        self.state.lock().position = raw;
    }

    /// Makes every subsequent connection attempt fail with `message`.
    pub fn fail_connect(&self, message: &str) {
        self.state.lock().fail_connect = Some(message.to_string());
    }

    /// Makes invocations of `method` fail with `message`. The call is
    /// still recorded.
    pub fn fail_method(&self, method: &str, message: &str) {
        self.state
            .lock()
            .fail_methods
            .insert(method.to_string(), message.to_string());
    }

    /// Makes session disconnects report a failure (they still count).
    pub fn fail_disconnect(&self) {
        self.state.lock().fail_disconnect = true;
    }

    /// Every procedure invocation seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Number of status poll batches served.
    pub fn poll_count(&self) -> usize {
        self.state.lock().polls
    }

    /// Number of sessions opened.
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Number of sessions closed.
    pub fn disconnect_count(&self) -> usize {
        self.state.lock().disconnects
    }
}

// =============================================================================
// Application-facing connector and session
// =============================================================================

/// Application-facing connector over the shared simulator state.
#[derive(Clone)]
pub struct SimConnector {
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl Connector for SimConnector {
    async fn connect(&self, _endpoint: &Endpoint) -> Result<Box<dyn OpcSession>> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_connect.clone() {
            return Err(ControlError::Connection(message));
        }
        state.connects += 1;
        Ok(Box::new(SimSession {
            state: self.state.clone(),
        }))
    }
}

struct SimSession {
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl OpcSession for SimSession {
    async fn call_method(&self, node_path: &str, method: &str, args: &[OpcValue]) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            node_path: node_path.to_string(),
            method: method.to_string(),
            args: args.to_vec(),
        });
        if let Some(message) = state.fail_methods.get(method) {
            return Err(ControlError::RemoteCall(message.clone()));
        }
        Ok(())
    }

    async fn read_value(&self, node_path: &str) -> Result<OpcValue> {
        let state = self.state.lock();
        let sample = state.current_sample();
        state.serve(node_path, &sample)
    }

    async fn read_values(&self, node_paths: &[String]) -> Result<Vec<OpcValue>> {
        let mut state = self.state.lock();
        let is_poll = node_paths.iter().any(|path| path.ends_with(STATUS_SUFFIX));
        if is_poll {
            state.polls += 1;
        }
        let sample = state.current_sample();
        let values = node_paths
            .iter()
            .map(|path| state.serve(path, &sample))
            .collect::<Result<Vec<_>>>()?;
        if is_poll {
            state.advance_script();
        }
        Ok(values)
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.disconnects += 1;
        if state.fail_disconnect {
            return Err(ControlError::Connection(
                "simulated disconnect failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_steps_are_served_in_order_and_the_last_repeats() {
        let sim = SimServer::new();
        sim.script_statuses([("MOVING", "OPERATIONAL"), ("STANDING", "OPERATIONAL")]);
        let session = sim
            .connector()
            .connect(&SimServer::endpoint())
            .await
            .unwrap();

        let nodes = vec![
            "MAIN.DL_Servo_1.stat.sStatus".to_string(),
            "MAIN.DL_Servo_1.stat.sState".to_string(),
        ];
        let first = session.read_values(&nodes).await.unwrap();
        let second = session.read_values(&nodes).await.unwrap();
        let third = session.read_values(&nodes).await.unwrap();

        assert_eq!(first[0], OpcValue::Text("MOVING".to_string()));
        assert_eq!(second[0], OpcValue::Text("STANDING".to_string()));
        assert_eq!(third[0], OpcValue::Text("STANDING".to_string()));
        assert_eq!(sim.poll_count(), 3);
    }

    #[tokio::test]
    async fn an_empty_script_reports_settled_immediately() {
        let sim = SimServer::new();
        let session = sim
            .connector()
            .connect(&SimServer::endpoint())
            .await
            .unwrap();
        let value = session
            .read_value("MAIN.DL_Servo_1.stat.sStatus")
            .await
            .unwrap();
        assert_eq!(value, OpcValue::Text("STANDING".to_string()));
    }

    #[tokio::test]
    async fn unknown_nodes_are_remote_call_errors() {
        let sim = SimServer::new();
        let session = sim
            .connector()
            .connect(&SimServer::endpoint())
            .await
            .unwrap();
        let err = session.read_value("MAIN.Nothing.here").await.unwrap_err();
        assert!(matches!(err, ControlError::RemoteCall(_)));
    }

    #[tokio::test]
    async fn failed_methods_are_still_recorded() {
        let sim = SimServer::new();
        sim.fail_method("RPC_Open", "interlock");
        let session = sim
            .connector()
            .connect(&SimServer::endpoint())
            .await
            .unwrap();
        let err = session
            .call_method("MAIN.nott_ics.Shutters.NSH1", "RPC_Open", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::RemoteCall(_)));
        assert_eq!(sim.calls().len(), 1);
    }
}
