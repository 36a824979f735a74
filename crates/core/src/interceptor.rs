// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Interceptor pipeline contract.
//!
//! Every outbound call made by an Outbound client is wrapped by an
//! [`Interceptor`]. The interceptor receives the call's request descriptor and
//! a [`Next`] step that performs the call; it may observe, annotate or
//! short-circuit the call, and it owns whatever tracing, logging or metrics
//! policy the application wants.
//!
//! Two shapes are offered:
//!
//! - [`Interceptor::handle`] returns the response produced by `next`.
//! - [`Interceptor::handle_inject`] hands `next` a pre-allocated response
//!   which it fills in place.
//!
//! The trait is generic over the request/response pair so one interceptor
//! value can serve several call shapes (for instance the high-level client
//! and the raw round-trip transport) while staying object safe for each.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::Context;

/// Type-erased error returned by transports and interceptors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Terminal step handed to [`Interceptor::handle`].
pub type Next<'a, Req, Rsp> =
    Box<dyn FnOnce(Context, Req) -> BoxFuture<'a, Result<Rsp, BoxError>> + Send + 'a>;

/// Terminal step handed to [`Interceptor::handle_inject`].
///
/// The response is borrowed only for the duration of the step, so an
/// interceptor can still inspect it once `next` has completed.
pub type NextInject<'a, Req, Rsp> = Box<
    dyn for<'r> FnOnce(Context, Req, &'r mut Rsp) -> BoxFuture<'r, Result<(), BoxError>>
        + Send
        + 'a,
>;

/// Box a closure as a [`NextInject`] step.
///
/// Closures passed straight to `Box::new` do not get the higher-ranked
/// signature `NextInject` needs; this helper pins it down.
pub fn next_inject<'a, Req, Rsp, F>(f: F) -> NextInject<'a, Req, Rsp>
where
    F: for<'r> FnOnce(Context, Req, &'r mut Rsp) -> BoxFuture<'r, Result<(), BoxError>>
        + Send
        + 'a,
{
    Box::new(f)
}

/// Identifies the component and operation behind a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMeta {
    component_type: &'static str,
    component_name: String,
    method: String,
    callers_skip: usize,
}

impl CallMeta {
    /// Create metadata for one call.
    pub fn new(
        component_type: &'static str,
        component_name: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            component_type,
            component_name: component_name.into(),
            method: method.into(),
            callers_skip: 0,
        }
    }

    /// Component family, e.g. `"http"`.
    pub fn component_type(&self) -> &'static str {
        self.component_type
    }

    /// Name of the component instance.
    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Operation name; for HTTP this is the request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Number of wrapper frames between the user's call site and the
    /// interceptor, for call-site reporting.
    pub fn callers_skip(&self) -> usize {
        self.callers_skip
    }

    /// Account for `n` more wrapper frames.
    pub fn add_callers_skip(&mut self, n: usize) {
        self.callers_skip += n;
    }
}

impl fmt::Display for CallMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.component_type, self.component_name, self.method
        )
    }
}

/// Wraps outbound calls of one request/response shape.
pub trait Interceptor<Req, Rsp>: Send + Sync
where
    Req: Send + 'static,
    Rsp: Send + 'static,
{
    /// Wrap one call. Implementations must either call `next` exactly once
    /// or return their own response/error without calling it.
    fn handle<'a>(
        &'a self,
        ctx: Context,
        meta: &'a CallMeta,
        req: Req,
        next: Next<'a, Req, Rsp>,
    ) -> BoxFuture<'a, Result<Rsp, BoxError>>;

    /// Wrap one call whose response is filled in place by `next`.
    ///
    /// The default forwards straight to `next`.
    fn handle_inject<'a>(
        &'a self,
        ctx: Context,
        meta: &'a CallMeta,
        req: Req,
        rsp: &'a mut Rsp,
        next: NextInject<'a, Req, Rsp>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        let _ = meta;
        next(ctx, req, rsp)
    }
}

/// Interceptor that adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInterceptor;

impl<Req, Rsp> Interceptor<Req, Rsp> for NoopInterceptor
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
        next(ctx, req)
    }
}

/// Emits a structured `tracing` event and `metrics` samples for every call.
///
/// Metrics:
///
/// - `outbound_calls_total` (counter)
/// - `outbound_call_errors_total` (counter)
/// - `outbound_call_duration_seconds` (histogram)
///
/// all labelled with `component`, `name` and `method`.
#[derive(Debug, Clone, Default)]
pub struct TracingInterceptor {
    log_payloads: bool,
}

impl TracingInterceptor {
    /// Create an interceptor that logs call outcomes only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log the `Debug` form of requests and responses.
    pub fn with_payloads(mut self, log_payloads: bool) -> Self {
        self.log_payloads = log_payloads;
        self
    }

    fn started(&self, meta: &CallMeta, req: &dyn fmt::Debug) {
        if self.log_payloads {
            debug!(
                component = meta.component_type(),
                name = meta.component_name(),
                method = meta.method(),
                request = ?req,
                "outbound call started"
            );
        } else {
            debug!(
                component = meta.component_type(),
                name = meta.component_name(),
                method = meta.method(),
                "outbound call started"
            );
        }
    }

    fn finished(&self, meta: &CallMeta, started: Instant, error: Option<&BoxError>) {
        let elapsed = started.elapsed();
        let labels = [
            ("component", meta.component_type().to_string()),
            ("name", meta.component_name().to_string()),
            ("method", meta.method().to_string()),
        ];

        metrics::counter!("outbound_calls_total", &labels).increment(1);
        metrics::histogram!("outbound_call_duration_seconds", &labels)
            .record(elapsed.as_secs_f64());

        match error {
            None => debug!(
                component = meta.component_type(),
                name = meta.component_name(),
                method = meta.method(),
                elapsed_ms = elapsed.as_millis() as u64,
                "outbound call finished"
            ),
            Some(err) => {
                metrics::counter!("outbound_call_errors_total", &labels).increment(1);
                warn!(
                    component = meta.component_type(),
                    name = meta.component_name(),
                    method = meta.method(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "outbound call failed"
                );
            }
        }
    }
}

impl<Req, Rsp> Interceptor<Req, Rsp> for TracingInterceptor
where
    Req: fmt::Debug + Send + 'static,
    Rsp: fmt::Debug + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        ctx: Context,
        meta: &'a CallMeta,
        req: Req,
        next: Next<'a, Req, Rsp>,
    ) -> BoxFuture<'a, Result<Rsp, BoxError>> {
        Box::pin(async move {
            let started = Instant::now();
            self.started(meta, &req);

            let result = next(ctx, req).await;
            match &result {
                Ok(rsp) => {
                    if self.log_payloads {
                        debug!(response = ?rsp, "outbound call response");
                    }
                    self.finished(meta, started, None);
                }
                Err(err) => self.finished(meta, started, Some(err)),
            }
            result
        })
    }

    fn handle_inject<'a>(
        &'a self,
        ctx: Context,
        meta: &'a CallMeta,
        req: Req,
        rsp: &'a mut Rsp,
        next: NextInject<'a, Req, Rsp>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async move {
            let started = Instant::now();
            self.started(meta, &req);

            let result = next(ctx, req, &mut *rsp).await;
            if result.is_ok() && self.log_payloads {
                debug!(response = ?rsp, "outbound call response");
            }
            self.finished(meta, started, result.as_ref().err());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ping(u32);

    #[derive(Debug, Default, PartialEq)]
    struct Pong(u32);

    fn meta() -> CallMeta {
        CallMeta::new("test", "unit", "PING")
    }

    #[test]
    fn test_call_meta_callers_skip_accumulates() {
        let mut meta = meta();
        meta.add_callers_skip(1);
        meta.add_callers_skip(2);
        assert_eq!(meta.callers_skip(), 3);
        assert_eq!(meta.to_string(), "test/unit/PING");
    }

    #[tokio::test]
    async fn test_noop_forwards_to_next() {
        let meta = meta();
        let rsp = Interceptor::<Ping, Pong>::handle(
            &NoopInterceptor,
            Context::background(),
            &meta,
            Ping(2),
            Box::new(|_ctx, req| Box::pin(async move { Ok(Pong(req.0 * 2)) })),
        )
        .await
        .unwrap();
        assert_eq!(rsp, Pong(4));
    }

    #[tokio::test]
    async fn test_default_handle_inject_fills_response() {
        let meta = meta();
        let mut rsp = Pong::default();
        Interceptor::<Ping, Pong>::handle_inject(
            &NoopInterceptor,
            Context::background(),
            &meta,
            Ping(7),
            &mut rsp,
            next_inject(|_ctx, req: Ping, out: &mut Pong| {
                Box::pin(async move {
                    out.0 = req.0;
                    Ok(())
                })
            }),
        )
        .await
        .unwrap();
        assert_eq!(rsp, Pong(7));
    }

    #[tokio::test]
    async fn test_tracing_inject_sees_filled_response() {
        let meta = meta();
        let mut rsp = Pong::default();
        let interceptor = TracingInterceptor::new().with_payloads(true);
        Interceptor::<Ping, Pong>::handle_inject(
            &interceptor,
            Context::background(),
            &meta,
            Ping(3),
            &mut rsp,
            next_inject(|_ctx, req: Ping, out: &mut Pong| {
                Box::pin(async move {
                    out.0 = req.0 + 1;
                    Ok(())
                })
            }),
        )
        .await
        .unwrap();
        assert_eq!(rsp, Pong(4));
    }

    #[tokio::test]
    async fn test_tracing_interceptor_propagates_errors() {
        let meta = meta();
        let interceptor = TracingInterceptor::new().with_payloads(true);
        let err = Interceptor::<Ping, Pong>::handle(
            &interceptor,
            Context::background(),
            &meta,
            Ping(1),
            Box::new(|_ctx, _req| Box::pin(async { Err("boom".into()) })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
