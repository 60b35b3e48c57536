//! The HTTP transport seam and its default `ureq` implementation.
//!
//! # Design
//! `Connection` only needs "send this request, give me the status" from the
//! network, so that contract is the `Transport` trait. The connection owns a
//! factory rather than a transport: the handle is created the first time a
//! request needs it and reused afterwards. Tests swap the factory for one
//! that returns a scripted fake.
//!
//! `UreqTransport` returns every HTTP status as data. Only failures that
//! happen before a status line arrives become `TransportError`s, plus
//! bodies larger than an explicitly configured `max_body_bytes`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Redirect hops followed when `TransportConfig::follow_redirects` is set.
const MAX_REDIRECTS: u32 = 10;

/// Minimal synchronous HTTP client used by `Connection`.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Execute `request` and return the response, whatever its status.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Issue a bodyless HEAD request to `url`.
    fn head(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.send(&HttpRequest::new(HttpMethod::Head, url))
    }

    /// Type name of the implementation, reported by `Connection::config`.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Builds the transport handle on first use.
pub type TransportFactory = Box<dyn Fn() -> Arc<dyn Transport> + Send + Sync>;

/// Defaults applied to the transport a `Connection` creates for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Whole-request timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Off by default so availability checks observe 3xx statuses.
    pub follow_redirects: bool,
    /// Largest response body read into memory. `None` reads bodies of any size.
    pub max_body_bytes: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Some(30_000),
            follow_redirects: false,
            max_body_bytes: None,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// A factory producing a `UreqTransport` with these settings.
    pub fn into_factory(self) -> TransportFactory {
        Box::new(move || Arc::new(UreqTransport::new(&self)) as Arc<dyn Transport>)
    }
}

/// Blocking transport backed by a single `ureq::Agent`.
pub struct UreqTransport {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let redirects = if config.follow_redirects { MAX_REDIRECTS } else { 0 };
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(redirects)
            .timeout_global(config.timeout())
            .build()
            .new_agent();
        debug!(?config, "created ureq transport");
        Self {
            agent,
            config: config.clone(),
        }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();
        let headers = request.headers.as_slice();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), headers).call(),
            HttpMethod::Head => with_headers(self.agent.head(url), headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), headers).call(),
            HttpMethod::Options => with_headers(self.agent.options(url), headers).call(),
            HttpMethod::Post => send_body(with_headers(self.agent.post(url), headers), body),
            HttpMethod::Put => send_body(with_headers(self.agent.put(url), headers), body),
            HttpMethod::Patch => send_body(with_headers(self.agent.patch(url), headers), body),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let body = if request.method == HttpMethod::Head {
            String::new()
        } else {
            let limit = self.config.max_body_bytes.unwrap_or(u64::MAX);
            response.body_mut().with_config().limit(limit).read_to_string()?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Header values that are not visible ASCII are decoded lossily.
fn header_pairs(headers: &ureq::http::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        let code = match &err {
            ureq::Error::Io(io) => io.raw_os_error().map_or(0, i64::from),
            _ => 0,
        };
        TransportError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_times_out_and_does_not_follow_redirects() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(!config.follow_redirects);
        assert_eq!(config.max_body_bytes, None);
    }

    #[test]
    fn config_deserializes_with_defaults_for_missing_fields() {
        let config: TransportConfig = serde_json::from_str(r#"{"timeout_ms":250}"#).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
        assert!(!config.follow_redirects);
    }

    #[test]
    fn factory_builds_a_fresh_ureq_transport_per_call() {
        let factory = TransportConfig::default().into_factory();
        let a = factory();
        let b = factory();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(a.name().ends_with("UreqTransport"));
    }

    #[test]
    fn non_ascii_header_values_survive() {
        use ureq::http::{HeaderMap, HeaderValue};

        let mut headers = HeaderMap::new();
        headers.insert("x-data-source", HeaderValue::from_bytes("café".as_bytes()).unwrap());
        headers.insert("x-broken", HeaderValue::from_bytes(b"a\xffb").unwrap());

        let pairs = header_pairs(&headers);

        assert!(pairs.contains(&("x-data-source".to_string(), "café".to_string())));
        assert!(pairs.contains(&("x-broken".to_string(), "a\u{fffd}b".to_string())));
    }

    #[test]
    fn io_errors_keep_their_os_code() {
        let io = std::io::Error::from_raw_os_error(111);
        let err = TransportError::from(ureq::Error::Io(io));
        assert_eq!(err.code, 111);
    }
}
