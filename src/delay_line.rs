//! Delay line motion control.
//!
//! Each operation is self-contained: it opens its own session, issues the
//! remote procedure, and releases the session before returning. Move
//! procedures are fire-and-forget on the PLC side, so after issuing one
//! the operation polls the device's status pair until it reports
//! `STANDING`/`OPERATIONAL` (see [`crate::poll`]).
//!
//! A timeout on the polling phase does not stop the physical device: the
//! move was already accepted, and no stop command is sent. Callers who
//! time out must treat the delay line position as unknown until the next
//! read.

use crate::addressing::DeviceRef;
use crate::config::Endpoint;
use crate::error::{ControlError, Result};
use crate::poll::{wait_until, CompletionPolicy, StatusSample};
use crate::session::{with_session, Connector, OpcValue};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Remote procedure starting a relative move.
pub const RPC_MOVE_REL: &str = "RPC_MoveRel";
/// Remote procedure starting an absolute move.
pub const RPC_MOVE_ABS: &str = "RPC_MoveAbs";

/// Factor from raw controller units to instrument units.
pub const POSITION_SCALE: f64 = 1000.0;

/// One delay line servo, addressed by its logical motor name.
///
/// Holds no connection: every method acquires and releases its own
/// session, so independent tasks can drive different delay lines through
/// clones of the same connector without coordination.
pub struct DelayLine {
    connector: Arc<dyn Connector>,
    endpoint: Endpoint,
    device: DeviceRef,
    policy: CompletionPolicy,
}

impl DelayLine {
    /// Binds a delay line to its motor identifier, e.g. `DL_Servo_1`.
    ///
    /// The identifier is validated here, before any connection is opened.
    pub fn new(connector: Arc<dyn Connector>, endpoint: Endpoint, motor_id: &str) -> Result<Self> {
        Ok(Self {
            device: DeviceRef::motor(motor_id)?,
            connector,
            endpoint,
            policy: CompletionPolicy::motion_settled(),
        })
    }

    /// Replaces the completion policy used by move operations.
    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The resolved device this delay line talks to.
    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    /// Moves the delay line by `offset` at `speed` and waits until the
    /// drive reports the motion finished.
    #[instrument(skip(self), fields(device = %self.device), err)]
    pub async fn move_relative(&self, offset: f64, speed: f64) -> Result<()> {
        self.issue_move(RPC_MOVE_REL, offset, speed).await
    }

    /// Moves the delay line to `position` at `speed` and waits until the
    /// drive reports the motion finished.
    #[instrument(skip(self), fields(device = %self.device), err)]
    pub async fn move_absolute(&self, position: f64, speed: f64) -> Result<()> {
        self.issue_move(RPC_MOVE_ABS, position, speed).await
    }

    /// Reads the current position in instrument units.
    ///
    /// Single read of the actual-position node, rescaled by
    /// [`POSITION_SCALE`]. No polling.
    #[instrument(skip(self), fields(device = %self.device), err)]
    pub async fn position(&self) -> Result<f64> {
        let device = self.device.clone();
        with_session(self.connector.as_ref(), &self.endpoint, move |session| {
            Box::pin(async move {
                let value = session.read_value(&device.position_node()).await?;
                let raw = value.as_f64().ok_or_else(|| {
                    ControlError::RemoteCall(format!(
                        "position node returned a non-numeric value: {:?}",
                        value
                    ))
                })?;
                Ok(raw * POSITION_SCALE)
            })
        })
        .await
    }

    /// Issues a move procedure, then polls the status pair to completion.
    /// Range checks on amount and speed belong to the drive; nothing is
    /// clamped here.
    async fn issue_move(&self, method: &'static str, amount: f64, speed: f64) -> Result<()> {
        let device = self.device.clone();
        let policy = self.policy;
        with_session(self.connector.as_ref(), &self.endpoint, move |session| {
            Box::pin(async move {
                session
                    .call_method(
                        device.path(),
                        method,
                        &[OpcValue::Double(amount), OpcValue::Double(speed)],
                    )
                    .await?;
                debug!(device = %device, method, "move issued, waiting for completion");

                let status_node = device.status_node();
                let state_node = device.state_node();
                let settled = wait_until(&policy, || {
                    let nodes = vec![status_node.clone(), state_node.clone()];
                    async move {
                        let values = session.read_values(&nodes).await?;
                        StatusSample::from_values(&values)
                    }
                })
                .await?;
                debug!(device = %device, status = %settled.status, "motion complete");
                Ok(())
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimServer;
    use anyhow::Result;

    fn delay_line(sim: &SimServer, motor_id: &str) -> DelayLine {
        DelayLine::new(Arc::new(sim.connector()), SimServer::endpoint(), motor_id).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn move_relative_issues_the_rpc_with_offset_and_speed() -> Result<()> {
        let sim = SimServer::new();
        sim.script_statuses([("STANDING", "OPERATIONAL")]);

        delay_line(&sim, "DL_Servo_1").move_relative(0.5, 1.2).await?;

        let calls = sim.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].node_path, "MAIN.DL_Servo_1");
        assert_eq!(calls[0].method, RPC_MOVE_REL);
        assert_eq!(calls[0].args, vec![OpcValue::Double(0.5), OpcValue::Double(1.2)]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn position_is_raw_value_times_scale() -> Result<()> {
        let sim = SimServer::new();
        let raw = 0.042;
        sim.set_position(raw);

        let position = delay_line(&sim, "DL_Servo_1").position().await?;

        assert_eq!(position, raw * POSITION_SCALE);
        assert_eq!(sim.poll_count(), 0);
        Ok(())
    }

    #[test]
    fn malformed_motor_id_fails_before_any_connection() {
        let sim = SimServer::new();
        let err = DelayLine::new(Arc::new(sim.connector()), SimServer::endpoint(), "DL Servo")
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidDevice { .. }));
        assert_eq!(sim.connect_count(), 0);
    }
}
