//! Session management for the automation protocol.
//!
//! Everything the control layer asks of the OPC UA gateway fits in two
//! narrow traits: [`Connector`] opens a session to an endpoint, and
//! [`OpcSession`] invokes named procedures and reads nodes on it. Concrete
//! transports live behind these traits; the crate itself ships only the
//! scripted simulator in [`crate::sim`], since the wire protocol belongs to
//! whichever client library a deployment pairs this layer with.
//!
//! ## Session lifecycle
//!
//! Sessions are short-lived by design: every device operation opens its
//! own, uses it, and closes it. There is no pooling and no sharing between
//! concurrent operations. [`with_session`] is the one place that lifecycle
//! lives; using it (rather than calling [`ConnectionHandle::acquire`] and
//! [`ConnectionHandle::release`] by hand) guarantees the session is
//! released on every exit path, including remote rejections and polling
//! timeouts.

use crate::config::Endpoint;
use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, warn};

/// A value crossing the protocol boundary.
///
/// The PLC side only ever exchanges a handful of scalar types with this
/// layer: LREAL positions and speeds, STRING status words, and the odd
/// BOOL or integer flag.
#[derive(Debug, Clone, PartialEq)]
pub enum OpcValue {
    /// 64-bit float (LREAL).
    Double(f64),
    /// String value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
}

impl OpcValue {
    /// Numeric view of the value, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OpcValue::Double(value) => Some(*value),
            OpcValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// String view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OpcValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// One open session to an automation server.
///
/// # Contract
///
/// - `call_method` invokes a named procedure on a node path with
///   positional arguments and reports acceptance, not completion; the
///   remote device may keep working after it returns.
/// - `read_values` returns one value per requested path, in request order.
/// - `disconnect` is called exactly once, by [`ConnectionHandle::release`].
#[async_trait]
pub trait OpcSession: Send + Sync {
    /// Invokes the named remote procedure on the node at `node_path`.
    async fn call_method(&self, node_path: &str, method: &str, args: &[OpcValue]) -> Result<()>;

    /// Reads the current value of one node.
    async fn read_value(&self, node_path: &str) -> Result<OpcValue>;

    /// Reads several nodes; values come back in the same order as the
    /// request.
    async fn read_values(&self, node_paths: &[String]) -> Result<Vec<OpcValue>>;

    /// Closes the session.
    async fn disconnect(&self) -> Result<()>;
}

/// Opens sessions to an automation server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new session to `endpoint`. Fails with
    /// [`ControlError::Connection`](crate::ControlError::Connection) when
    /// the server is unreachable.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn OpcSession>>;
}

/// Exclusive ownership of one live session.
///
/// A handle belongs to exactly one operation, is never pooled, and is
/// consumed by [`release`](ConnectionHandle::release), so a released
/// session cannot be touched again by construction.
pub struct ConnectionHandle {
    session: Box<dyn OpcSession>,
    endpoint: String,
}

impl ConnectionHandle {
    /// Opens a session to `endpoint`.
    pub async fn acquire(connector: &dyn Connector, endpoint: &Endpoint) -> Result<Self> {
        debug!(endpoint = %endpoint, "opening session");
        let session = connector.connect(endpoint).await?;
        Ok(Self {
            session,
            endpoint: endpoint.url().to_string(),
        })
    }

    /// The session owned by this handle.
    pub fn session(&self) -> &dyn OpcSession {
        self.session.as_ref()
    }

    /// Closes the session, consuming the handle.
    ///
    /// Never fails: a close failure is logged and swallowed so it cannot
    /// mask the result of the operation that used the session.
    pub async fn release(self) {
        if let Err(error) = self.session.disconnect().await {
            warn!(endpoint = %self.endpoint, %error, "failed to close session cleanly");
        } else {
            debug!(endpoint = %self.endpoint, "session closed");
        }
    }
}

/// Runs `op` with a freshly acquired session, releasing it on every exit
/// path.
///
/// The result of `op` is returned untouched; in particular an error from
/// `op` is not masked by a failure to close the session. Acquisition
/// failures are returned without invoking `op`.
pub async fn with_session<T, F>(
    connector: &dyn Connector,
    endpoint: &Endpoint,
    op: F,
) -> Result<T>
where
    F: for<'s> FnOnce(&'s dyn OpcSession) -> BoxFuture<'s, Result<T>>,
{
    let handle = ConnectionHandle::acquire(connector, endpoint).await?;
    let result = op(handle.session()).await;
    handle.release().await;
    result
}
