//! Composition root for the control layer.
//!
//! A [`NottController`] is built once, from an endpoint the caller loaded
//! out of configuration (see [`crate::config`]), and then hands out device
//! values on demand. Operations themselves never touch the configuration
//! source; the endpoint they use is fixed at construction.

use crate::config::Endpoint;
use crate::delay_line::DelayLine;
use crate::error::Result;
use crate::poll::CompletionPolicy;
use crate::session::Connector;
use crate::shutter::Shutter;
use std::sync::Arc;

/// Hands out configured delay lines and shutters sharing one connector and
/// endpoint.
pub struct NottController {
    connector: Arc<dyn Connector>,
    endpoint: Endpoint,
    policy: CompletionPolicy,
}

impl NottController {
    /// Builds a controller over `connector` targeting `endpoint`.
    pub fn new(connector: Arc<dyn Connector>, endpoint: Endpoint) -> Self {
        Self {
            connector,
            endpoint,
            policy: CompletionPolicy::motion_settled(),
        }
    }

    /// Replaces the completion policy applied to delay lines handed out
    /// afterwards.
    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The endpoint every device from this controller talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// A delay line bound to `motor_id`, e.g. `DL_Servo_1`.
    pub fn delay_line(&self, motor_id: &str) -> Result<DelayLine> {
        DelayLine::new(self.connector.clone(), self.endpoint.clone(), motor_id)
            .map(|line| line.with_policy(self.policy))
    }

    /// A shutter bound to `shutter_id`, e.g. `1`.
    pub fn shutter(&self, shutter_id: &str) -> Result<Shutter> {
        Shutter::new(self.connector.clone(), self.endpoint.clone(), shutter_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;
    use crate::sim::SimServer;
    use anyhow::Result;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn policy_set_on_the_controller_reaches_its_delay_lines() -> Result<()> {
        let sim = SimServer::new();
        sim.script_statuses([("MOVING", "OPERATIONAL")]);

        let controller = NottController::new(Arc::new(sim.connector()), SimServer::endpoint())
            .with_policy(
                CompletionPolicy::motion_settled().with_timeout(Duration::from_millis(50)),
            );
        let line = controller.delay_line("DL_Servo_1")?;

        let err = line.move_relative(1.0, 1.0).await.unwrap_err();
        assert!(matches!(err, ControlError::Timeout { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_ids_are_rejected_without_connecting() {
        let sim = SimServer::new();
        let controller = NottController::new(Arc::new(sim.connector()), SimServer::endpoint());

        assert!(controller.delay_line("no spaces allowed").is_err());
        assert!(controller.shutter("NSH1").is_err());
        assert_eq!(sim.connect_count(), 0);
    }
}
