// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! A transport that routes raw round trips through the interceptor pipeline.
//!
//! Hand an [`InstrumentedTransport`] to any component that speaks HTTP (a
//! search client, an object store SDK) and its calls are traced the same way
//! as [`crate::Client`] calls. Request and response bodies are buffered so
//! interceptors can log them; each side is then given a fresh copy so the
//! caller still reads a complete body.

use std::fmt;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use http::response::Parts;
use http::StatusCode;
use outbound_core::{next_inject, BoxError, BoxFuture, CallMeta, Context, Interceptor};

use crate::body::Body;
use crate::error::{DispatchError, HttpError};
use crate::markers;
use crate::pipeline::{HttpInterceptor, COMPONENT_TYPE};
use crate::response::Response;
use crate::transport::RoundTrip;
use crate::values::{Header, Params};

/// What interceptors see of a raw round trip.
#[derive(Debug, Clone)]
pub struct RoundTripRequest {
    /// HTTP method.
    pub method: String,
    /// Full request URL.
    pub url: String,
    /// Request body, lossily decoded as UTF-8.
    pub body: String,
    /// Request headers. Edits made before calling the next step are sent.
    pub header: Header,
    /// Query parameters parsed from the URL.
    pub params: Params,
}

impl RoundTripRequest {
    fn new(parts: &http::request::Parts, body: &[u8]) -> Self {
        Self {
            method: parts.method.to_string(),
            url: parts.uri.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
            header: Header::from(&parts.headers),
            params: Params::from_query(parts.uri.query()),
        }
    }
}

/// The response of a raw round trip, filled in place by the pipeline's
/// terminal step.
#[derive(Debug, Default)]
pub struct RoundTripResponse {
    /// Status line form, e.g. `"200 OK"`.
    pub status: String,
    /// Status code.
    pub status_code: StatusCode,
    /// Declared `Content-Length`, `None` when unknown.
    pub content_length: Option<u64>,
    /// Whether the transport transparently decompressed the body.
    pub uncompressed: bool,
    /// Response headers.
    pub header: Header,
    /// Buffered response body. This is what the caller receives.
    pub body: Bytes,
    head: Option<Parts>,
}

impl RoundTripResponse {
    fn fill(&mut self, head: Parts, body: Bytes) {
        let described = Response::from_parts(&head);
        self.status = described.status;
        self.status_code = described.status_code;
        self.content_length = described.content_length;
        self.uncompressed = described.uncompressed;
        self.header = described.header;
        self.body = body;
        self.head = Some(head);
    }
}

/// A [`RoundTrip`] wrapper that sends every call through the pipeline's
/// `handle_inject`.
#[derive(Clone)]
pub struct InstrumentedTransport {
    name: String,
    inner: Arc<dyn RoundTrip>,
    interceptor: Arc<dyn HttpInterceptor>,
}

impl InstrumentedTransport {
    /// Wrap `inner`, reporting calls under component name `name`.
    pub fn new(
        name: impl Into<String>,
        inner: Arc<dyn RoundTrip>,
        interceptor: Arc<dyn HttpInterceptor>,
    ) -> Self {
        Self {
            name: name.into(),
            inner,
            interceptor,
        }
    }

    /// Component name reported to the pipeline.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn instrumented(
        &self,
        req: http::Request<Body>,
    ) -> Result<http::Response<Body>, BoxError> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await.map_err(HttpError::Read)?;

        let observed = RoundTripRequest::new(&parts, &body);
        let ctx = Context::from_extensions(parts.extensions.clone());
        let mut meta = CallMeta::new(COMPONENT_TYPE, self.name.as_str(), parts.method.as_str());
        meta.add_callers_skip(1);

        let inner = self.inner.clone();
        let next = next_inject(
            move |ctx, observed: RoundTripRequest, out: &mut RoundTripResponse| {
                Box::pin(async move {
                    let mut parts = parts;
                    parts.headers = observed.header.to_header_map()?;
                    let mut req = http::Request::from_parts(parts, Body::from(body));
                    let deadline = ctx.deadline();
                    req.extensions_mut().extend(ctx.into_extensions());

                    let call = async {
                        let rsp = inner.round_trip(req).await?;
                        let (head, body) = rsp.into_parts();
                        let body = body.collect().await.map_err(HttpError::Read)?;
                        out.fill(head, body);
                        Ok::<_, BoxError>(())
                    };
                    match deadline {
                        Some(deadline) => tokio::time::timeout_at(deadline, call)
                            .await
                            .map_err(|_| HttpError::from(DispatchError::DeadlineExceeded))?,
                        None => call.await,
                    }
                })
            },
        );

        let mut reply = RoundTripResponse::default();
        Interceptor::<RoundTripRequest, RoundTripResponse>::handle_inject(
            self.interceptor.as_ref(),
            ctx,
            &meta,
            observed,
            &mut reply,
            next,
        )
        .await?;

        let head = reply
            .head
            .take()
            .ok_or("interceptor completed a round trip without sending it")?;
        Ok(http::Response::from_parts(head, Body::from(reply.body)))
    }
}

#[async_trait]
impl RoundTrip for InstrumentedTransport {
    async fn round_trip(
        &self,
        req: http::Request<Body>,
    ) -> Result<http::Response<Body>, BoxError> {
        if markers::opted_out(req.extensions()) {
            return self.inner.round_trip(req).await;
        }
        self.instrumented(req).await
    }
}

impl tower::Service<http::Request<Body>> for InstrumentedTransport {
    type Response = http::Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Body>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.round_trip(req).await })
    }
}

impl fmt::Debug for InstrumentedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedTransport")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockRoundTrip;
    use futures::stream;
    use outbound_core::{Next, NextInject, NoopInterceptor};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Echoes the request body back with status 200.
    struct Echo;

    #[async_trait]
    impl RoundTrip for Echo {
        async fn round_trip(
            &self,
            req: http::Request<Body>,
        ) -> Result<http::Response<Body>, BoxError> {
            let streamed = req.body().is_stream();
            let body = req.into_body().collect().await?;
            let mut rsp = http::Response::new(Body::from(body));
            rsp.headers_mut()
                .insert("x-streamed", streamed.to_string().parse()?);
            Ok(rsp)
        }
    }

    /// Records what the pipeline saw.
    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        seen: Mutex<Vec<(usize, usize)>>,
    }

    impl<Req, Rsp> Interceptor<Req, Rsp> for Recorder
    where
        Req: Send + 'static,
        Rsp: Send + 'static,
    {
        fn handle<'a>(
            &'a self,
            ctx: Context,
            _meta: &'a CallMeta,
            req: Req,
            next: Next<'a, Req, Rsp>,
        ) -> BoxFuture<'a, Result<Rsp, BoxError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            next(ctx, req)
        }

        fn handle_inject<'a>(
            &'a self,
            ctx: Context,
            meta: &'a CallMeta,
            req: Req,
            rsp: &'a mut Rsp,
            next: NextInject<'a, Req, Rsp>,
        ) -> BoxFuture<'a, Result<(), BoxError>> {
            assert_eq!(meta.component_type(), "http");
            self.calls.fetch_add(1, Ordering::SeqCst);
            next(ctx, req, rsp)
        }
    }

    /// Records body sizes seen by the pipeline for round trips.
    struct SizeProbe(Arc<Recorder>);

    impl Interceptor<RoundTripRequest, RoundTripResponse> for SizeProbe {
        fn handle<'a>(
            &'a self,
            ctx: Context,
            _meta: &'a CallMeta,
            req: RoundTripRequest,
            next: Next<'a, RoundTripRequest, RoundTripResponse>,
        ) -> BoxFuture<'a, Result<RoundTripResponse, BoxError>> {
            next(ctx, req)
        }

        fn handle_inject<'a>(
            &'a self,
            ctx: Context,
            _meta: &'a CallMeta,
            req: RoundTripRequest,
            rsp: &'a mut RoundTripResponse,
            next: NextInject<'a, RoundTripRequest, RoundTripResponse>,
        ) -> BoxFuture<'a, Result<(), BoxError>> {
            Box::pin(async move {
                let sent = req.body.len();
                next(ctx, req, &mut *rsp).await?;
                self.0.seen.lock().unwrap().push((sent, rsp.body.len()));
                Ok(())
            })
        }
    }

    impl Interceptor<crate::DispatchRequest, crate::Response> for SizeProbe {
        fn handle<'a>(
            &'a self,
            ctx: Context,
            _meta: &'a CallMeta,
            req: crate::DispatchRequest,
            next: Next<'a, crate::DispatchRequest, crate::Response>,
        ) -> BoxFuture<'a, Result<crate::Response, BoxError>> {
            next(ctx, req)
        }
    }

    /// Stamps a trace header on every round trip and keeps the response
    /// metadata it saw.
    #[derive(Default)]
    struct Stamp {
        seen: Mutex<Option<(Option<u64>, bool)>>,
    }

    impl Interceptor<RoundTripRequest, RoundTripResponse> for Stamp {
        fn handle<'a>(
            &'a self,
            ctx: Context,
            _meta: &'a CallMeta,
            req: RoundTripRequest,
            next: Next<'a, RoundTripRequest, RoundTripResponse>,
        ) -> BoxFuture<'a, Result<RoundTripResponse, BoxError>> {
            next(ctx, req)
        }

        fn handle_inject<'a>(
            &'a self,
            ctx: Context,
            _meta: &'a CallMeta,
            mut req: RoundTripRequest,
            rsp: &'a mut RoundTripResponse,
            next: NextInject<'a, RoundTripRequest, RoundTripResponse>,
        ) -> BoxFuture<'a, Result<(), BoxError>> {
            Box::pin(async move {
                req.header.set("traceparent", "00-abc-def-01");
                next(ctx, req, &mut *rsp).await?;
                *self.seen.lock().unwrap() = Some((rsp.content_length, rsp.uncompressed));
                Ok(())
            })
        }
    }

    impl Interceptor<crate::DispatchRequest, crate::Response> for Stamp {
        fn handle<'a>(
            &'a self,
            ctx: Context,
            _meta: &'a CallMeta,
            req: crate::DispatchRequest,
            next: Next<'a, crate::DispatchRequest, crate::Response>,
        ) -> BoxFuture<'a, Result<crate::Response, BoxError>> {
            next(ctx, req)
        }
    }

    /// Echoes selected request headers and reports a decompressed body.
    struct HeaderEcho;

    #[async_trait]
    impl RoundTrip for HeaderEcho {
        async fn round_trip(
            &self,
            req: http::Request<Body>,
        ) -> Result<http::Response<Body>, BoxError> {
            let mut rsp = http::Response::new(Body::from("ok"));
            for name in ["traceparent", "x-original"] {
                if let Some(value) = req.headers().get(name) {
                    rsp.headers_mut().insert(name, value.clone());
                }
            }
            rsp.headers_mut().insert(
                http::header::CONTENT_LENGTH,
                http::HeaderValue::from_static("2"),
            );
            rsp.extensions_mut().insert(crate::response::Uncompressed);
            Ok(rsp)
        }
    }

    fn chunked(payload: &[u8]) -> Body {
        let chunks: Vec<io::Result<Bytes>> = payload
            .chunks(4096)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Body::from_stream(stream::iter(chunks))
    }

    async fn round_trip_sizes(payload: Vec<u8>) {
        let recorder = Arc::new(Recorder::default());
        let transport = InstrumentedTransport::new(
            "probe",
            Arc::new(Echo),
            Arc::new(SizeProbe(recorder.clone())),
        );
        let mut req = http::Request::new(chunked(&payload));
        *req.method_mut() = http::Method::POST;

        let rsp = transport.round_trip(req).await.unwrap();
        assert_eq!(rsp.headers()["x-streamed"], "false");
        let returned = rsp.into_body().collect().await.unwrap();
        assert_eq!(returned.len(), payload.len());
        assert_eq!(returned, Bytes::from(payload.clone()));
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![(payload.len(), payload.len())]
        );
    }

    #[tokio::test]
    async fn test_buffers_and_replaces_empty_body() {
        round_trip_sizes(Vec::new()).await;
    }

    #[tokio::test]
    async fn test_buffers_and_replaces_large_body() {
        let payload: Vec<u8> = (0..70 * 1024).map(|i| b'a' + (i % 26) as u8).collect();
        round_trip_sizes(payload).await;
    }

    #[tokio::test]
    async fn test_opted_out_request_skips_pipeline_and_buffering() {
        let recorder = Arc::new(Recorder::default());
        let transport = InstrumentedTransport::new("spy", Arc::new(Echo), recorder.clone());

        let mut req = http::Request::new(chunked(b"raw"));
        req.extensions_mut().extend(
            markers::without_interceptors(Context::background()).into_extensions(),
        );
        let rsp = transport.round_trip(req).await.unwrap();

        assert_eq!(rsp.headers()["x-streamed"], "true");
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_read_error_stops_before_network() {
        let mut inner = MockRoundTrip::new();
        inner.expect_round_trip().never();
        let transport =
            InstrumentedTransport::new("broken", Arc::new(inner), Arc::new(NoopInterceptor));

        let body = Body::from_stream(stream::iter(vec![Err::<Bytes, _>(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated",
        ))]));
        let err = transport.round_trip(http::Request::new(body)).await.unwrap_err();
        assert!(matches!(
            HttpError::from_transport(err),
            HttpError::Read(_)
        ));
    }

    #[tokio::test]
    async fn test_tower_service_routes_through_pipeline() {
        let recorder = Arc::new(Recorder::default());
        let transport = InstrumentedTransport::new("svc", Arc::new(Echo), recorder.clone());

        let rsp = transport
            .oneshot(http::Request::new(Body::from("ping")))
            .await
            .unwrap();

        assert_eq!(rsp.into_body().collect().await.unwrap(), Bytes::from("ping"));
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interceptor_headers_reach_the_wire() {
        let stamp = Arc::new(Stamp::default());
        let transport = InstrumentedTransport::new("trace", Arc::new(HeaderEcho), stamp.clone());

        let mut req = http::Request::new(Body::from("x"));
        req.headers_mut()
            .insert("x-original", http::HeaderValue::from_static("kept"));
        let rsp = transport.round_trip(req).await.unwrap();

        assert_eq!(rsp.headers()["traceparent"], "00-abc-def-01");
        assert_eq!(rsp.headers()["x-original"], "kept");
    }

    #[tokio::test]
    async fn test_response_metadata_visible_to_interceptors() {
        let stamp = Arc::new(Stamp::default());
        let transport = InstrumentedTransport::new("meta", Arc::new(HeaderEcho), stamp.clone());

        transport
            .round_trip(http::Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(*stamp.seen.lock().unwrap(), Some((Some(2), true)));
    }

    #[tokio::test]
    async fn test_round_trip_request_describes_call() {
        let parts = http::Request::builder()
            .method(http::Method::PUT)
            .uri("http://svc/v1/doc?id=9")
            .header("content-type", "text/plain")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let observed = RoundTripRequest::new(&parts, b"hello");
        assert_eq!(observed.method, "PUT");
        assert_eq!(observed.url, "http://svc/v1/doc?id=9");
        assert_eq!(observed.body, "hello");
        assert_eq!(observed.params.get("id"), Some("9"));
        assert_eq!(observed.header.get("Content-Type"), Some("text/plain"));
    }
}
