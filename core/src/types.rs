//! Value types describing a connection's endpoint and its current state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConnectionError;

/// URL scheme used to reach the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An empty string selects the default, `http`.
impl FromStr for Protocol {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scheme = s.trim();
        if scheme.is_empty() || scheme.eq_ignore_ascii_case("http") {
            Ok(Protocol::Http)
        } else if scheme.eq_ignore_ascii_case("https") {
            Ok(Protocol::Https)
        } else {
            Err(ConnectionError::UnsupportedProtocol {
                protocol: s.to_string(),
            })
        }
    }
}

/// Snapshot of a connection returned by `Connection::config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub protocol: Protocol,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub url: String,
    /// Identity of the `Connection` value the snapshot was taken from.
    pub instance: Uuid,
    /// Type name of the transport, `None` until one has been created.
    pub transport: Option<String>,
    pub error_messages: Vec<String>,
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Object config:")?;
        writeln!(f, "\tprotocol = {}", self.protocol)?;
        writeln!(f, "\thost = {}", self.host)?;
        match self.port {
            Some(port) => writeln!(f, "\tport = {port}")?,
            None => writeln!(f, "\tport = ")?,
        }
        writeln!(f, "\tpath = {}", self.path)?;
        writeln!(f, "\turl = {}", self.url)?;
        writeln!(f, "\tinstance = {}", self.instance)?;
        writeln!(
            f,
            "\ttransport = {}",
            self.transport.as_deref().unwrap_or("none")
        )?;
        writeln!(f, "\terror_messages = [{}]", self.error_messages.join("; "))
    }
}
