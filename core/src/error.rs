//! Error types for the gateway crate.
//!
//! # Design
//! Request failures are never returned as errors: the gateway resolves every
//! response into an `Outcome`. `GatewayError` covers the remaining failures
//! around it (building payloads, decoding bodies, loading configuration, a
//! descriptor abandoned in the queue). `TransportError` is what a transport
//! reports when it obtained no HTTP status at all, or a status whose body
//! it could not read.

use thiserror::Error;

/// Errors raised outside of response classification.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The gateway was dropped while the request was still queued.
    #[error("request {0} was abandoned before completion")]
    Abandoned(uuid::Uuid),

    /// `try_take` already yielded the outcome.
    #[error("outcome of request {0} was already taken")]
    AlreadyTaken(uuid::Uuid),
}

/// A round-trip that produced no usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No HTTP status was obtained, e.g. connection refused.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// A status arrived but the body could not be read in full.
    #[error("unreadable response body (status {status}): {reason}")]
    UnreadableBody { status: u16, reason: String },
}

pub type Result<T> = std::result::Result<T, GatewayError>;
