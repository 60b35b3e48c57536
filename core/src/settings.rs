//! Endpoint settings read from a config document or the environment.
//!
//! # Design
//! Every field is optional so a deployment can give either a full URL
//! (`DRUID_URL`) or the discrete parts. `Connection::from_settings` decides
//! how they combine. Environment lookup goes through a closure so tests can
//! supply values without touching the process environment.

use serde::Deserialize;
use thiserror::Error;

use crate::transport::TransportConfig;

pub const ENV_URL: &str = "DRUID_URL";
pub const ENV_PROTOCOL: &str = "DRUID_PROTOCOL";
pub const ENV_HOST: &str = "DRUID_HOST";
pub const ENV_PORT: &str = "DRUID_PORT";
pub const ENV_PATH: &str = "DRUID_PATH";
pub const ENV_TIMEOUT_MS: &str = "DRUID_TIMEOUT_MS";

/// Errors produced while reading `EndpointSettings`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{key} must be {expected}, got `{value}`")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Where the Druid endpoint lives and how to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub url: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub transport: TransportConfig,
}

impl EndpointSettings {
    /// Read settings from the `DRUID_*` environment variables.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = get(ENV_PORT)
            .map(|value| parse_number(ENV_PORT, value, "a port number"))
            .transpose()?;
        let mut transport = TransportConfig::default();
        if let Some(value) = get(ENV_TIMEOUT_MS) {
            transport.timeout_ms = Some(parse_number(ENV_TIMEOUT_MS, value, "a number of milliseconds")?);
        }

        Ok(Self {
            url: get(ENV_URL),
            protocol: get(ENV_PROTOCOL),
            host: get(ENV_HOST),
            port,
            path: get(ENV_PATH),
            transport,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    value: String,
    expected: &'static str,
) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidValue { key, value, expected })
}
