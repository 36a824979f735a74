// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! The high-level HTTP client.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use outbound_core::{CallMeta, Context, Interceptor, Next};

use crate::decode::decode;
use crate::dispatch::{dispatch, DispatchRequest};
use crate::error::{HttpError, Result};
use crate::markers;
use crate::pipeline::{HttpInterceptor, COMPONENT_TYPE};
use crate::request::{Request, RequestOption};
use crate::resolve::resolve;
use crate::response::Response;
use crate::transport::Transports;

/// A named, instrumented HTTP client.
///
/// Every call is resolved, wrapped by the interceptor pipeline, dispatched
/// and decoded. Calls made under a context marked with
/// [`crate::without_interceptors`] bypass the pipeline.
///
/// Cloning is cheap; clones share transports and interceptor.
#[derive(Clone)]
pub struct Client {
    name: String,
    transports: Transports,
    interceptor: Arc<dyn HttpInterceptor>,
}

impl Client {
    /// Create a client reporting calls under component name `name`.
    pub fn new(
        name: impl Into<String>,
        transports: Transports,
        interceptor: Arc<dyn HttpInterceptor>,
    ) -> Self {
        Self {
            name: name.into(),
            transports,
            interceptor,
        }
    }

    /// Component name reported to the pipeline.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The transports this client dispatches through.
    pub fn transports(&self) -> &Transports {
        &self.transports
    }

    /// `GET path`.
    pub async fn get<'a, I>(
        &self,
        ctx: &Context,
        path: impl Into<String>,
        opts: I,
    ) -> Result<Response>
    where
        I: IntoIterator<Item = RequestOption<'a>>,
    {
        self.call(ctx, Method::GET, path.into(), Bytes::new(), opts).await
    }

    /// `HEAD path`.
    pub async fn head<'a, I>(
        &self,
        ctx: &Context,
        path: impl Into<String>,
        opts: I,
    ) -> Result<Response>
    where
        I: IntoIterator<Item = RequestOption<'a>>,
    {
        self.call(ctx, Method::HEAD, path.into(), Bytes::new(), opts).await
    }

    /// `POST path` with a raw body.
    pub async fn post<'a, I>(
        &self,
        ctx: &Context,
        path: impl Into<String>,
        body: impl Into<Bytes>,
        opts: I,
    ) -> Result<Response>
    where
        I: IntoIterator<Item = RequestOption<'a>>,
    {
        self.call(ctx, Method::POST, path.into(), body.into(), opts).await
    }

    /// `PUT path` with a raw body.
    pub async fn put<'a, I>(
        &self,
        ctx: &Context,
        path: impl Into<String>,
        body: impl Into<Bytes>,
        opts: I,
    ) -> Result<Response>
    where
        I: IntoIterator<Item = RequestOption<'a>>,
    {
        self.call(ctx, Method::PUT, path.into(), body.into(), opts).await
    }

    /// `PATCH path` with a raw body.
    pub async fn patch<'a, I>(
        &self,
        ctx: &Context,
        path: impl Into<String>,
        body: impl Into<Bytes>,
        opts: I,
    ) -> Result<Response>
    where
        I: IntoIterator<Item = RequestOption<'a>>,
    {
        self.call(ctx, Method::PATCH, path.into(), body.into(), opts).await
    }

    /// `DELETE path` with a raw body.
    pub async fn delete<'a, I>(
        &self,
        ctx: &Context,
        path: impl Into<String>,
        body: impl Into<Bytes>,
        opts: I,
    ) -> Result<Response>
    where
        I: IntoIterator<Item = RequestOption<'a>>,
    {
        self.call(ctx, Method::DELETE, path.into(), body.into(), opts).await
    }

    async fn call<'a, I>(
        &self,
        ctx: &Context,
        method: Method,
        path: String,
        body: Bytes,
        opts: I,
    ) -> Result<Response>
    where
        I: IntoIterator<Item = RequestOption<'a>>,
    {
        let mut req = Request::new(method, path, body);
        req.apply(opts);
        self.send(ctx, req).await
    }

    /// Send a fully built request.
    ///
    /// Input and output conflicts are reported before anything is encoded or
    /// sent. On success the response carries either a buffered body or, when
    /// streaming was requested, a live body the caller must drop.
    pub async fn send(&self, ctx: &Context, mut req: Request<'_>) -> Result<Response> {
        let resolved = resolve(&mut req)?;

        let mut ctx = ctx.clone();
        if !req.proxy.is_empty() {
            ctx = markers::with_proxy(ctx, req.proxy.clone());
        }

        let rsp = if markers::is_without_interceptors(&ctx) {
            dispatch(ctx, &self.transports, resolved).await?
        } else {
            self.intercepted(ctx, resolved).await?
        };

        decode(&mut req, &rsp)?;
        Ok(rsp)
    }

    async fn intercepted(&self, ctx: Context, req: DispatchRequest) -> Result<Response> {
        let mut meta = CallMeta::new(COMPONENT_TYPE, self.name.as_str(), req.method.as_str());
        meta.add_callers_skip(1);

        let transports = &self.transports;
        let next: Next<'_, DispatchRequest, Response> = Box::new(move |ctx, req| {
            Box::pin(async move { dispatch(ctx, transports, req).await.map_err(Into::into) })
        });

        Interceptor::<DispatchRequest, Response>::handle(
            self.interceptor.as_ref(),
            ctx,
            &meta,
            req,
            next,
        )
        .await
        .map_err(HttpError::from_pipeline)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
