//! A configurable connection to one Druid endpoint.
//!
//! # Design
//! `Connection` keeps the endpoint in two forms: the discrete parts
//! (protocol, host, port, path) and the last URL that passed validation.
//! `build_url` derives a URL from the parts and runs it through the same
//! validation as `set_url`, and every network operation calls it first.
//! A direct `set_url` on a connection without a host back-fills protocol,
//! host and path from the URL so the next derivation reproduces it. The
//! port is never back-filled.
//!
//! The transport handle is created by the connection's factory the first
//! time a request needs it and reused for the rest of the connection's life.
//!
//! Failures the connection absorbs (rejected URLs, failed availability
//! checks, unsupported protocols) are kept as tagged `ConnectionError`s;
//! `error_messages` renders them as text. The log only grows.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::ConnectionError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::Query;
use crate::settings::EndpointSettings;
use crate::transport::{Transport, TransportConfig, TransportFactory};
use crate::types::{ConnectionConfig, Protocol};

/// Status the availability check accepts. Nothing else counts, not even other 2xx codes.
const AVAILABLE_STATUS: u16 = 200;

/// Connection to a single Druid endpoint. See the module docs for the URL rules.
pub struct Connection {
    id: Uuid,
    protocol: Protocol,
    host: String,
    port: Option<u16>,
    path: String,
    url: String,
    query: Option<Arc<dyn Query>>,
    factory: TransportFactory,
    transport: Option<Arc<dyn Transport>>,
    last_response: Option<HttpResponse>,
    diagnostics: Vec<ConnectionError>,
}

impl Connection {
    /// An unconfigured connection using a default `UreqTransport`.
    pub fn new() -> Self {
        Self::with_transport_config(TransportConfig::default())
    }

    /// An unconfigured connection whose `UreqTransport` uses `config`.
    pub fn with_transport_config(config: TransportConfig) -> Self {
        Self::from_factory(config.into_factory())
    }

    /// An unconfigured connection that obtains its transport from `factory`.
    ///
    /// The factory runs at most once, on the first request.
    pub fn with_transport_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Transport> + Send + Sync + 'static,
    {
        Self::from_factory(Box::new(factory))
    }

    /// A connection configured from `settings`.
    ///
    /// The discrete fields are applied first and the URL last, so a URL only
    /// back-fills the fields when no host was given.
    pub fn from_settings(settings: EndpointSettings) -> Self {
        let mut connection = Self::with_transport_config(settings.transport);
        if let Some(protocol) = settings.protocol.as_deref() {
            connection.set_protocol(protocol);
        }
        if let Some(host) = settings.host {
            connection.set_host(host);
        }
        connection.set_port(settings.port);
        if let Some(path) = settings.path {
            connection.set_path(path);
        }
        if let Some(url) = settings.url.as_deref() {
            // A rejected URL is recorded in the diagnostics.
            connection.set_url(url).ok();
        }
        connection
    }

    fn from_factory(factory: TransportFactory) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol: Protocol::default(),
            host: String::new(),
            port: None,
            path: String::new(),
            url: String::new(),
            query: None,
            factory,
            transport: None,
            last_response: None,
            diagnostics: Vec::new(),
        }
    }

    /// Identity of this connection, reported by `config`.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Set the scheme from its name. An empty name selects `http`.
    ///
    /// Names other than `http` and `https` are recorded as diagnostics and
    /// leave the protocol unchanged, so later requests keep using the
    /// previous scheme.
    pub fn set_protocol(&mut self, protocol: &str) -> &mut Self {
        match protocol.parse::<Protocol>() {
            Ok(protocol) => self.protocol = protocol,
            Err(err) => self.record(err),
        }
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Set or clear the port. Port `0` clears it.
    pub fn set_port(&mut self, port: impl Into<Option<u16>>) -> &mut Self {
        self.port = port.into().filter(|&port| port != 0);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = path.into();
        self
    }

    /// The last URL that passed validation, empty if none has yet.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Validate `candidate` and make it the endpoint URL.
    ///
    /// When no host is configured, protocol, host and path are back-filled
    /// from the URL. On failure the diagnostic is recorded and the previous
    /// URL stays in place.
    pub fn set_url(&mut self, candidate: &str) -> Result<&mut Self, ConnectionError> {
        self.apply_url(candidate)?;
        Ok(self)
    }

    /// Derive the URL from the discrete fields and validate it like `set_url`.
    ///
    /// Returns the resulting URL, which is the previous one if the derived
    /// candidate was rejected.
    pub fn build_url(&mut self) -> &str {
        let candidate = self.derive_url();
        if self.apply_url(&candidate).is_err() {
            debug!(connection = %self.id, url = %self.url, "derived URL rejected, keeping previous");
        }
        &self.url
    }

    pub fn query(&self) -> Option<&Arc<dyn Query>> {
        self.query.as_ref()
    }

    /// Attach `query`, replacing any query attached before.
    pub fn set_query(&mut self, query: Arc<dyn Query>) -> &mut Self {
        self.query = Some(query);
        self
    }

    /// The transport handle, created through the factory on first call.
    pub fn transport(&mut self) -> Arc<dyn Transport> {
        let factory = &self.factory;
        let id = self.id;
        let transport = self.transport.get_or_insert_with(|| {
            let transport = factory();
            debug!(connection = %id, transport = transport.name(), "transport created");
            transport
        });
        Arc::clone(transport)
    }

    /// The response to the most recent request that reached the endpoint.
    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    /// Send a `method` request to the endpoint and keep the response.
    ///
    /// For methods that carry a body, the attached query supplies it. Any
    /// HTTP status is a successful round-trip here; transport failures are
    /// returned to the caller and not recorded.
    pub fn execute_query(&mut self, method: HttpMethod) -> Result<&HttpResponse, ConnectionError> {
        let url = self.endpoint()?;
        let mut request = HttpRequest::new(method, url);
        if let Some(query) = self.query.as_ref().filter(|_| method.allows_body()) {
            request.body = Some(query.body()?);
            request
                .headers
                .push(("content-type".to_string(), query.content_type().to_string()));
        }

        let transport = self.transport();
        debug!(connection = %self.id, %method, url = %request.url, "executing query");
        let response = transport.send(&request)?;
        debug!(connection = %self.id, status = response.status, "query answered");
        Ok(self.last_response.insert(response))
    }

    /// HEAD the endpoint and report why it is unavailable, if it is.
    ///
    /// Transport failures are recorded as diagnostics. Any status other
    /// than exactly 200 is `NonOkStatus`, which is not recorded.
    pub fn check_availability(&mut self) -> Result<(), ConnectionError> {
        let url = self.endpoint()?;
        let transport = self.transport();
        match transport.head(&url) {
            Ok(response) => {
                let status = response.status;
                self.last_response = Some(response);
                if status == AVAILABLE_STATUS {
                    Ok(())
                } else {
                    Err(ConnectionError::NonOkStatus { status })
                }
            }
            Err(err) => {
                let err = ConnectionError::from(err);
                self.record(err.clone());
                Err(err)
            }
        }
    }

    /// Whether the endpoint answers a HEAD request with exactly 200.
    pub fn is_connection_available(&mut self) -> bool {
        let outcome = self.check_availability();
        match &outcome {
            Ok(()) => info!(connection = %self.id, url = %self.url, "endpoint available"),
            Err(err) => info!(connection = %self.id, url = %self.url, reason = %err, "endpoint unavailable"),
        }
        outcome.is_ok()
    }

    /// Snapshot of the endpoint fields, identities and diagnostics.
    ///
    /// Does not create the transport; `transport` is `None` until a request has.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig {
            protocol: self.protocol,
            host: self.host.clone(),
            port: self.port,
            path: self.path.clone(),
            url: self.url.clone(),
            instance: self.id,
            transport: self.transport.as_ref().map(|t| t.name().to_string()),
            error_messages: self.error_messages(),
        }
    }

    /// `config` rendered one field per line.
    pub fn config_string(&self) -> String {
        self.config().to_string()
    }

    /// Every recorded failure, oldest first.
    pub fn diagnostics(&self) -> &[ConnectionError] {
        &self.diagnostics
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }

    fn derive_url(&self) -> String {
        let port = self.port.map(|port| format!(":{port}")).unwrap_or_default();
        format!("{}://{}{}/{}", self.protocol, self.host, port, self.path)
    }

    fn apply_url(&mut self, candidate: &str) -> Result<(), ConnectionError> {
        let trimmed = candidate.trim();
        let Some(parsed) = validate_url(trimmed) else {
            let err = ConnectionError::InvalidUrl {
                candidate: candidate.to_string(),
            };
            self.record(err.clone());
            return Err(err);
        };

        if self.host.is_empty() {
            if let Ok(protocol) = parsed.scheme().parse() {
                self.protocol = protocol;
            }
            self.host = raw_host(trimmed)
                .or(parsed.host_str())
                .unwrap_or_default()
                .to_string();
            let path = parsed.path();
            self.path = path.strip_prefix('/').unwrap_or(path).to_string();
        }
        self.url = trimmed.to_string();
        Ok(())
    }

    /// Rebuild the URL and return it, or fail if no URL has ever validated.
    fn endpoint(&mut self) -> Result<String, ConnectionError> {
        let url = self.build_url();
        if url.is_empty() {
            return Err(ConnectionError::InvalidUrl {
                candidate: self.derive_url(),
            });
        }
        Ok(url.to_string())
    }

    fn record(&mut self, err: ConnectionError) {
        warn!(connection = %self.id, "{err}");
        self.diagnostics.push(err);
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("transport", &self.transport)
            .field("last_response", &self.last_response)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

/// Parse `candidate`, requiring an `http`/`https` scheme and a non-empty
/// authority written out after `://`.
fn validate_url(candidate: &str) -> Option<Url> {
    // The URL parser reads "http:///x" as host "x"; require the authority explicitly.
    let (_, rest) = candidate.split_once("://")?;
    if rest.is_empty() || rest.starts_with('/') {
        return None;
    }
    let parsed = Url::parse(candidate).ok()?;
    let supported = matches!(parsed.scheme(), "http" | "https");
    let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
    (supported && has_host).then_some(parsed)
}

/// The host exactly as written in an already validated `url`. The URL
/// parser lowercases hosts; back-filled fields keep the caller's spelling.
fn raw_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = if host_port.starts_with('[') {
        &host_port[..=host_port.find(']')?]
    } else {
        host_port.split(':').next()?
    };
    (!host.is_empty()).then_some(host)
}
