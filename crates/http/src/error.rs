// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the HTTP client core.
//!
//! Nothing here is retried or recovered locally: every error is returned to
//! the immediate caller. Retry policy, if any, belongs to the interceptor
//! pipeline.

use std::io;

use outbound_core::BoxError;
use thiserror::Error;

/// Errors produced by [`crate::Client`] and the transports.
#[derive(Debug, Error)]
pub enum HttpError {
    /// More than one of raw body, JSON input, YAML input and stream input was set.
    #[error("body, JSON input, YAML input and stream input are mutually exclusive")]
    ConflictingInputSource,

    /// More than one of stream output, JSON output and YAML output was set.
    #[error("stream output, JSON output and YAML output are mutually exclusive")]
    ConflictingOutputSink,

    /// Encoding the request body failed; no network call was made.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Decoding the response body into the caller's target failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The transport call failed or the deadline expired.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Buffering a request or response body failed.
    #[error("failed to read body: {0}")]
    Read(#[source] io::Error),

    /// Method, URL or header could not form an HTTP request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A proxy string could not be used.
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// An error raised by the interceptor pipeline itself.
    #[error("interceptor error: {0}")]
    Interceptor(#[source] BoxError),
}

impl HttpError {
    /// Whether the call failed because its deadline expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Dispatch(DispatchError::DeadlineExceeded))
    }

    /// Recover an `HttpError` that travelled through the interceptor pipeline
    /// as a boxed error. Errors raised by the pipeline itself are kept as
    /// [`HttpError::Interceptor`].
    pub fn from_pipeline(err: BoxError) -> Self {
        match err.downcast::<HttpError>() {
            Ok(err) => *err,
            Err(err) => HttpError::Interceptor(err),
        }
    }

    /// Classify an error returned by a [`crate::RoundTrip`] implementation.
    /// Transports built on this crate return `HttpError`s, which are passed
    /// through unchanged; anything else is a transport failure.
    pub fn from_transport(err: BoxError) -> Self {
        match err.downcast::<HttpError>() {
            Ok(err) => *err,
            Err(err) => HttpError::Dispatch(DispatchError::Transport(err)),
        }
    }
}

/// Request body encoding failures.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON encoding failed.
    #[error("failed to encode JSON body: {0}")]
    Json(#[source] serde_json::Error),

    /// YAML encoding failed.
    #[error("failed to encode YAML body: {0}")]
    Yaml(#[source] serde_yaml::Error),
}

/// Response body decoding failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON decoding failed.
    #[error(transparent)]
    Json(serde_json::Error),

    /// YAML decoding failed.
    #[error(transparent)]
    Yaml(serde_yaml::Error),
}

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The per-call timeout or the caller's deadline expired.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// DNS, connect, TLS or protocol failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

/// Proxy resolution failures.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The proxy string is not a URL.
    #[error("invalid proxy URL {raw:?}: {source}")]
    Invalid {
        /// The proxy string as supplied.
        raw: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    /// The proxy scheme is not one of `http`, `https`, `socks5`, `socks5h`.
    #[error("unsupported proxy scheme {scheme:?} in {raw:?}")]
    UnsupportedScheme {
        /// The proxy string as supplied.
        raw: String,
        /// The rejected scheme.
        scheme: String,
    },
}

/// Result type for HTTP client operations.
pub type Result<T> = std::result::Result<T, HttpError>;
