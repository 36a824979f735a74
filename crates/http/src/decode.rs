// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Moves the buffered response body into the caller's decode target.

use crate::error::{DecodeError, Result};
use crate::request::Request;
use crate::response::Response;

/// Decode `rsp.body` into whichever target `req` carries. Streamed responses
/// and requests without a target are left alone.
pub(crate) fn decode(req: &mut Request<'_>, rsp: &Response) -> Result<()> {
    if req.out_is_stream {
        return Ok(());
    }
    if let Some(target) = req.out_json.as_mut() {
        target.decode_json(&rsp.body).map_err(DecodeError::Json)?;
    } else if let Some(target) = req.out_yaml.as_mut() {
        target.decode_yaml(&rsp.body).map_err(DecodeError::Yaml)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::request::{with_out_json, with_out_yaml};
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn response(body: &'static str) -> Response {
        let (parts, ()) = http::Response::builder()
            .status(StatusCode::OK)
            .body(())
            .unwrap()
            .into_parts();
        let mut rsp = Response::from_parts(&parts);
        rsp.body = Bytes::from_static(body.as_bytes());
        rsp
    }

    #[test]
    fn test_decode_json_target() {
        let mut item = Item::default();
        let mut req = Request::new(Method::GET, "http://svc", "").with(with_out_json(&mut item));
        decode(&mut req, &response(r#"{"id":3}"#)).unwrap();
        drop(req);
        assert_eq!(item, Item { id: 3 });
    }

    #[test]
    fn test_decode_yaml_target() {
        let mut item = Item::default();
        let mut req = Request::new(Method::GET, "http://svc", "").with(with_out_yaml(&mut item));
        decode(&mut req, &response("id: 5\n")).unwrap();
        drop(req);
        assert_eq!(item, Item { id: 5 });
    }

    #[test]
    fn test_decode_error_is_returned() {
        let mut item = Item::default();
        let mut req = Request::new(Method::GET, "http://svc", "").with(with_out_json(&mut item));
        let err = decode(&mut req, &response("not json")).unwrap_err();
        assert!(matches!(err, HttpError::Decode(DecodeError::Json(_))));
    }

    #[test]
    fn test_no_target_is_noop() {
        let mut req = Request::new(Method::GET, "http://svc", "");
        decode(&mut req, &response("anything")).unwrap();
    }
}
