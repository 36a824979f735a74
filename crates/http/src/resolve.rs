// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Turns a [`Request`] into the single body stream sent on the wire.

use bytes::Bytes;

use crate::body::Body;
use crate::dispatch::DispatchRequest;
use crate::error::{EncodeError, HttpError, Result};
use crate::request::Request;

/// Validate sources and sinks, encode any typed input, and produce the owned
/// request seen by the pipeline and the dispatcher.
///
/// Both exclusivity checks run before anything is encoded. Decode targets
/// stay on `req` for the decoder.
pub(crate) fn resolve(req: &mut Request<'_>) -> Result<DispatchRequest> {
    let sources = [
        !req.body.is_empty(),
        req.in_stream.is_some(),
        req.in_json.is_some(),
        req.in_yaml.is_some(),
    ];
    if sources.into_iter().filter(|set| *set).count() > 1 {
        return Err(HttpError::ConflictingInputSource);
    }

    let sinks = [
        req.out_is_stream,
        req.out_json.is_some(),
        req.out_yaml.is_some(),
    ];
    if sinks.into_iter().filter(|set| *set).count() > 1 {
        return Err(HttpError::ConflictingOutputSink);
    }

    req.in_is_stream = req.in_stream.is_some();

    if let Some(source) = req.in_json {
        req.body = Bytes::from(source.encode_json().map_err(EncodeError::Json)?);
    } else if let Some(source) = req.in_yaml {
        req.body = Bytes::from(source.encode_yaml().map_err(EncodeError::Yaml)?);
    }

    let body = match req.in_stream.take() {
        Some(stream) => stream,
        None if req.body.is_empty() => Body::empty(),
        None => Body::from(req.body.clone()),
    };

    Ok(DispatchRequest {
        method: req.method.clone(),
        path: req.path.clone(),
        timeout: req.timeout,
        insecure_skip_verify: req.insecure_skip_verify,
        header: req.header.clone(),
        params: req.params.clone(),
        body_text: req.body.clone(),
        body,
        in_is_stream: req.in_is_stream,
        out_is_stream: req.out_is_stream,
    })
}
