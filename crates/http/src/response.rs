// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Response descriptor.

use std::fmt;

use bytes::Bytes;
use http::response::Parts;
use http::{header, StatusCode};

use crate::body::Body;
use crate::values::Header;

/// Response extension set by transports that transparently decompressed the
/// body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uncompressed;

/// Result of one call.
///
/// Exactly one of [`Response::body`] and [`Response::body_stream`] carries the
/// payload. A `body_stream` holds the connection open until it is dropped.
pub struct Response {
    /// Status line form, e.g. `"200 OK"`.
    pub status: String,
    /// Status code.
    pub status_code: StatusCode,
    /// `Content-Length` as sent by the server; `None` when unknown.
    pub content_length: Option<u64>,
    /// Response headers.
    pub header: Header,
    /// The transport decompressed the body before handing it over.
    pub uncompressed: bool,
    /// Buffered body (empty when streaming).
    pub body: Bytes,
    /// Live body (set only when streaming was requested).
    pub body_stream: Option<Body>,
}

impl Response {
    pub(crate) fn from_parts(parts: &Parts) -> Self {
        Self {
            status: status_line(parts.status),
            status_code: parts.status,
            content_length: parts
                .headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
            header: Header::from(&parts.headers),
            uncompressed: parts.extensions.get::<Uncompressed>().is_some(),
            body: Bytes::new(),
            body_stream: None,
        }
    }

    /// Whether the status code is 2xx.
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// The buffered body as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Take ownership of the live body, if any.
    pub fn into_body_stream(self) -> Option<Body> {
        self.body_stream
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => status.as_str().to_owned(),
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("header", &self.header)
            .field("uncompressed", &self.uncompressed)
            .field("body_len", &self.body.len())
            .field("body_stream", &self.body_stream)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_copies_metadata() {
        let (mut parts, ()) = http::Response::builder()
            .status(StatusCode::CREATED)
            .header("content-length", "12")
            .header("x-trace", "t1")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(Uncompressed);

        let rsp = Response::from_parts(&parts);
        assert_eq!(rsp.status, "201 Created");
        assert_eq!(rsp.status_code, StatusCode::CREATED);
        assert_eq!(rsp.content_length, Some(12));
        assert_eq!(rsp.header.get("X-Trace"), Some("t1"));
        assert!(rsp.uncompressed);
        assert!(rsp.body_stream.is_none());
    }

    #[test]
    fn test_unknown_length_and_reason() {
        let (parts, ()) = http::Response::builder()
            .status(599)
            .body(())
            .unwrap()
            .into_parts();
        let rsp = Response::from_parts(&parts);
        assert_eq!(rsp.status, "599");
        assert_eq!(rsp.content_length, None);
        assert!(!rsp.uncompressed);
    }
}
