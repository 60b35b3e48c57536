//! Error types for the Druid connection.
//!
//! # Design
//! Every failure the connection can observe is a tagged `ConnectionError`.
//! Operations return these tags directly, and the connection additionally
//! records the ones it absorbs (invalid URLs, failed availability checks)
//! so `Connection::error_messages` can render them as a free-text trail.
//! The `Display` output of the recorded variants is that trail.

use thiserror::Error;

/// A failure reported by a [`Transport`](crate::transport::Transport)
/// before any HTTP status was received (refused connection, DNS, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Exception {code} caught with message: {message}")]
pub struct TransportError {
    /// OS error code when the failure came from an I/O error, otherwise 0.
    pub code: i64,
    pub message: String,
}

impl TransportError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors produced by `Connection` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The candidate failed URL validation; the previous URL is kept.
    #[error("Error, URL {candidate} is not a valid URL")]
    InvalidUrl { candidate: String },

    /// The protocol is neither `http` nor `https`; the previous protocol is kept.
    #[error("Error, protocol {protocol} is not supported")]
    UnsupportedProtocol { protocol: String },

    /// The transport failed before an HTTP status was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The availability check was answered with something other than 200.
    #[error("endpoint answered with status {status}")]
    NonOkStatus { status: u16 },

    /// The attached query could not produce a request body.
    #[error("query serialization failed: {0}")]
    Serialization(String),
}
