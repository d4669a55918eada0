//! Beam shutter control.
//!
//! Shutter commands are fire-and-return: each one opens a session, invokes
//! the remote procedure, and returns as soon as the controller accepts it.
//! Unlike delay line moves, nothing polls for the mechanics afterwards.
//! Whether shutter procedures genuinely complete synchronously on the PLC
//! is an open question inherited from the instrument scripts; the
//! asymmetry is kept deliberately rather than papered over, so a caller
//! that needs a confirmed shutter state must read it back explicitly.

use crate::addressing::DeviceRef;
use crate::config::Endpoint;
use crate::error::Result;
use crate::session::{with_session, Connector};
use std::sync::Arc;
use tracing::instrument;

/// Remote procedure closing the shutter.
pub const RPC_CLOSE: &str = "RPC_Close";
/// Remote procedure opening the shutter.
pub const RPC_OPEN: &str = "RPC_Open";
/// Remote procedure halting shutter motion.
pub const RPC_STOP: &str = "RPC_Stop";
/// Remote procedure acknowledging a fault.
pub const RPC_RESET: &str = "RPC_Reset";
/// Remote procedure re-running the startup sequence.
pub const RPC_INIT: &str = "RPC_Init";
/// Remote procedure enabling the drive.
pub const RPC_ENABLE: &str = "RPC_Enable";
/// Remote procedure disabling the drive.
pub const RPC_DISABLE: &str = "RPC_Disable";

/// One beam shutter, addressed by its number (`1` through `4` on the
/// current bench).
pub struct Shutter {
    connector: Arc<dyn Connector>,
    endpoint: Endpoint,
    device: DeviceRef,
}

impl Shutter {
    /// Binds a shutter to its numeric identifier.
    ///
    /// The identifier is validated here, before any connection is opened.
    pub fn new(
        connector: Arc<dyn Connector>,
        endpoint: Endpoint,
        shutter_id: &str,
    ) -> Result<Self> {
        Ok(Self {
            device: DeviceRef::shutter(shutter_id)?,
            connector,
            endpoint,
        })
    }

    /// The resolved device this shutter talks to.
    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    /// Closes the shutter.
    pub async fn close(&self) -> Result<()> {
        self.command(RPC_CLOSE).await
    }

    /// Opens the shutter.
    pub async fn open(&self) -> Result<()> {
        self.command(RPC_OPEN).await
    }

    /// Halts shutter motion.
    pub async fn stop(&self) -> Result<()> {
        self.command(RPC_STOP).await
    }

    /// Acknowledges a drive fault.
    pub async fn reset(&self) -> Result<()> {
        self.command(RPC_RESET).await
    }

    /// Re-runs the drive startup sequence.
    pub async fn init(&self) -> Result<()> {
        self.command(RPC_INIT).await
    }

    /// Enables the drive.
    pub async fn enable(&self) -> Result<()> {
        self.command(RPC_ENABLE).await
    }

    /// Disables the drive.
    pub async fn disable(&self) -> Result<()> {
        self.command(RPC_DISABLE).await
    }

    #[instrument(skip(self), fields(device = %self.device), err)]
    async fn command(&self, method: &'static str) -> Result<()> {
        let device = self.device.clone();
        with_session(self.connector.as_ref(), &self.endpoint, move |session| {
            Box::pin(async move { session.call_method(device.path(), method, &[]).await })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;
    use crate::sim::SimServer;
    use anyhow::Result;

    #[tokio::test]
    async fn close_fires_the_rpc_without_polling() -> Result<()> {
        let sim = SimServer::new();
        let shutter = Shutter::new(Arc::new(sim.connector()), SimServer::endpoint(), "2")?;

        shutter.close().await?;

        let calls = sim.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].node_path, "MAIN.nott_ics.Shutters.NSH2");
        assert_eq!(calls[0].method, RPC_CLOSE);
        assert!(calls[0].args.is_empty());
        assert_eq!(sim.poll_count(), 0);
        Ok(())
    }

    #[test]
    fn malformed_shutter_id_fails_before_any_connection() {
        let sim = SimServer::new();
        let err = Shutter::new(Arc::new(sim.connector()), SimServer::endpoint(), "two")
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidDevice { .. }));
        assert_eq!(sim.connect_count(), 0);
    }
}
