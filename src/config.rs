//! Configuration management.
//!
//! The control layer needs exactly one piece of configuration: the address
//! of the OPC UA gateway fronting the instrument PLC. It is loaded once by
//! the composition root and handed to operations as an [`Endpoint`] value;
//! no operation reads the configuration source itself.

use crate::error::{ControlError, Result};
use config::Config;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Address of the automation server, e.g. `opc.tcp://10.33.178.141:4840`.
///
/// Immutable once constructed. The crate never re-reads configuration after
/// the endpoint has been built, so a running operation cannot observe a
/// config change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    /// Wraps a server address string.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The address string as given.
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deserialized control-layer configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    /// Address of the OPC UA server. Required.
    pub opcua_address: String,
}

impl ControlConfig {
    /// Loads configuration from a TOML file, with `NOTT_`-prefixed
    /// environment variables overriding file values
    /// (`NOTT_OPCUA_ADDRESS=...`).
    ///
    /// A missing or empty `opcua_address` is a configuration error,
    /// reported before any connection attempt.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("NOTT"))
            .build()?;

        let parsed: ControlConfig = settings.try_deserialize()?;
        if parsed.opcua_address.trim().is_empty() {
            return Err(ControlError::Configuration(
                "opcua_address must not be empty".to_string(),
            ));
        }
        Ok(parsed)
    }

    /// The endpoint to inject into device operations.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.opcua_address.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn loads_endpoint_from_toml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nott.toml");
        std::fs::write(&path, "opcua_address = \"opc.tcp://10.0.0.5:4840\"\n")?;

        let cfg = ControlConfig::load(&path)?;
        assert_eq!(cfg.endpoint().url(), "opc.tcp://10.0.0.5:4840");
        assert_eq!(cfg.endpoint(), cfg.endpoint());
        Ok(())
    }

    #[test]
    fn missing_address_key_is_a_config_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("other.toml");
        std::fs::write(&path, "log_level = \"debug\"\n")?;

        let err = match ControlConfig::load(&path) {
            Err(err) => err,
            Ok(_) => anyhow::bail!("load should fail without opcua_address"),
        };
        assert!(matches!(err, ControlError::Config(_)));
        Ok(())
    }

    #[test]
    fn empty_address_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "opcua_address = \"  \"\n")?;

        let err = match ControlConfig::load(&path) {
            Err(err) => err,
            Ok(_) => anyhow::bail!("load should reject a blank address"),
        };
        assert!(matches!(err, ControlError::Configuration(_)));
        Ok(())
    }
}
