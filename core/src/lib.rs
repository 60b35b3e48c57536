//! Connection manager for a Druid query endpoint.
//!
//! # Overview
//! A [`Connection`] holds the endpoint either as protocol, host, port and
//! path or as a ready URL, validates the URL it derives, executes requests
//! through a lazily created [`Transport`] and answers whether the endpoint
//! is available (a HEAD request answered with exactly 200).
//!
//! # Design
//! - Construct one `Connection` and pass it to whoever needs it; there is
//!   no process-wide instance.
//! - The transport sits behind a trait and is built by an injectable
//!   factory, `UreqTransport` by default.
//! - Operations return [`ConnectionError`]; the failures a connection
//!   absorbs are also kept as a diagnostic trail.
//! - Everything is synchronous. Mutating calls take `&mut self`, so one
//!   request is in flight per connection.

pub mod connection;
pub mod error;
pub mod http;
pub mod query;
pub mod settings;
pub mod transport;
pub mod types;

pub use connection::Connection;
pub use error::{ConnectionError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ParseMethodError};
pub use query::{JsonQuery, Query};
pub use settings::{EndpointSettings, SettingsError};
pub use transport::{Transport, TransportConfig, TransportFactory, UreqTransport};
pub use types::{ConnectionConfig, Protocol};
