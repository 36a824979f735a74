// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sends a resolved request through the selected transport.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Uri};
use outbound_core::Context;
use tracing::{debug, warn};
use url::Url;

use crate::body::Body;
use crate::error::{DispatchError, HttpError, Result};
use crate::response::Response;
use crate::transport::Transports;
use crate::values::{Header, Params};

/// A request whose body has been resolved to a single stream.
///
/// This is the request value interceptors see for client calls.
pub struct DispatchRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL before query merging.
    pub path: String,
    /// Per-call timeout; zero means none.
    pub timeout: Duration,
    /// Use the skip-verify transport.
    pub insecure_skip_verify: bool,
    /// Headers replacing the transport defaults, if set.
    pub header: Option<Header>,
    /// Query parameters to merge into `path`.
    pub params: Option<Params>,
    /// Encoded or raw body bytes, for logging. Empty for stream input.
    pub body_text: Bytes,
    /// The body sent on the wire.
    pub body: Body,
    /// The body came from a caller-supplied stream.
    pub in_is_stream: bool,
    /// The response body is returned live instead of buffered.
    pub out_is_stream: bool,
}

impl fmt::Debug for DispatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("DispatchRequest");
        out.field("method", &self.method)
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("header", &self.header)
            .field("params", &self.params);
        if self.in_is_stream {
            out.field("body", &self.body);
        } else {
            out.field("body", &String::from_utf8_lossy(&self.body_text));
        }
        out.field("out_is_stream", &self.out_is_stream).finish()
    }
}

/// Perform one call.
///
/// The caller's deadline is narrowed by the request timeout and covers the
/// round trip plus buffering of a non-stream body. A streamed body is handed
/// back unread and is not bound by the deadline once returned.
pub(crate) async fn dispatch(
    ctx: Context,
    transports: &Transports,
    req: DispatchRequest,
) -> Result<Response> {
    let ctx = if req.timeout > Duration::ZERO {
        ctx.with_timeout(req.timeout)
    } else {
        ctx
    };
    let deadline = ctx.deadline();
    let method = req.method.clone();
    let out_is_stream = req.out_is_stream;
    let transport = transports.select(req.insecure_skip_verify).clone();
    let http_req = build_request(ctx, req)?;
    let uri = http_req.uri().clone();

    debug!(%method, %uri, out_is_stream, "dispatching request");

    let call = async {
        let rsp = transport.round_trip(http_req).await.map_err(|err| {
            let err = HttpError::from_transport(err);
            warn!(%method, %uri, error = %err, "transport call failed");
            err
        })?;

        let (parts, body) = rsp.into_parts();
        let mut out = Response::from_parts(&parts);
        if out_is_stream {
            out.body_stream = Some(body);
        } else {
            // `collect` drops the stream on return, read error or not.
            out.body = body.collect().await.map_err(HttpError::Read)?;
        }
        Ok::<_, HttpError>(out)
    };

    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, call)
            .await
            .map_err(|_| HttpError::from(DispatchError::DeadlineExceeded))?,
        None => call.await,
    }
}

fn build_request(ctx: Context, req: DispatchRequest) -> Result<http::Request<Body>> {
    let uri = match req.params.as_ref().filter(|p| !p.is_empty()) {
        Some(params) => merge_query(&req.path, params)?,
        None => req.path.clone(),
    };
    let uri = Uri::try_from(uri.as_str())
        .map_err(|e| HttpError::InvalidRequest(format!("url {uri:?}: {e}")))?;

    let mut http_req = http::Request::new(req.body);
    *http_req.method_mut() = req.method;
    *http_req.uri_mut() = uri;
    if let Some(header) = &req.header {
        *http_req.headers_mut() = header.to_header_map()?;
    }
    http_req.extensions_mut().extend(ctx.into_extensions());
    Ok(http_req)
}

/// Append `params` to the query already present on `path` and re-encode the
/// whole query sorted by key.
fn merge_query(path: &str, params: &Params) -> Result<String> {
    let mut url = Url::parse(path)
        .map_err(|e| HttpError::InvalidRequest(format!("url {path:?}: {e}")))?;
    let mut merged = Params::from_query(url.query());
    for (key, values) in params.iter() {
        for value in values {
            merged.add(key, value.clone());
        }
    }
    url.set_query(Some(&merged.encode()));
    Ok(url.into())
}
