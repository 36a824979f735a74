// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! The round-trip seam and the reqwest-backed transports.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use outbound_core::BoxError;
use tracing::debug;
use url::Url;

use crate::body::Body;
use crate::config::TransportConfig;
use crate::error::{HttpError, Result};
use crate::markers;
use crate::proxy::ProxyResolver;

/// Executes one HTTP exchange.
///
/// Implementations must not interpret status codes: any response that was
/// received is `Ok`. The returned body may be a live stream that holds the
/// connection until dropped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoundTrip: Send + Sync {
    /// Send `req` and return the response head with its body.
    async fn round_trip(
        &self,
        req: http::Request<Body>,
    ) -> std::result::Result<http::Response<Body>, BoxError>;
}

/// HTTP/1.1 and HTTP/2 transport backed by `reqwest`.
///
/// The proxy for each request is resolved per call; one underlying client is
/// kept for every distinct proxy seen, plus one for direct connections.
pub struct RawTransport {
    config: TransportConfig,
    insecure: bool,
    resolver: Arc<ProxyResolver>,
    clients: DashMap<String, reqwest::Client>,
}

impl RawTransport {
    /// Build a transport. With `insecure` set, TLS certificates are not
    /// verified.
    pub fn new(
        config: TransportConfig,
        insecure: bool,
        resolver: Arc<ProxyResolver>,
    ) -> Result<Self> {
        let transport = Self {
            config,
            insecure,
            resolver,
            clients: DashMap::new(),
        };
        // Surface builder errors at construction rather than on first use.
        transport.client_for(None)?;
        Ok(transport)
    }

    fn client_for(&self, proxy: Option<&Url>) -> Result<reqwest::Client> {
        let key = proxy.map(Url::as_str).unwrap_or_default();
        if let Some(client) = self.clients.get(key) {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout())
            .tcp_keepalive(self.config.tcp_keepalive())
            .pool_max_idle_per_host(self.config.max_idle_connections_per_host)
            .pool_idle_timeout(self.config.idle_timeout())
            .danger_accept_invalid_certs(self.insecure)
            .no_proxy();
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str()).map_err(HttpError::Build)?);
        }
        let client = builder.build().map_err(HttpError::Build)?;

        debug!(proxy = key, insecure = self.insecure, "built http client");
        Ok(self
            .clients
            .entry(key.to_owned())
            .or_insert(client)
            .clone())
    }

    async fn execute(&self, req: http::Request<Body>) -> Result<http::Response<Body>> {
        let url = Url::parse(&req.uri().to_string())
            .map_err(|e| HttpError::InvalidRequest(format!("url {}: {e}", req.uri())))?;
        let proxy = self
            .resolver
            .resolve(markers::proxy_override(req.extensions()), &url)?;
        let client = self.client_for(proxy.as_ref())?;

        let (parts, body) = req.into_parts();
        let mut outgoing = client.request(parts.method, url).headers(parts.headers);
        if !body.is_empty() {
            outgoing = outgoing.body(body.into_reqwest());
        }

        let rsp = outgoing
            .send()
            .await
            .map_err(|e| HttpError::from_transport(Box::new(e)))?;

        let mut out = http::Response::new(Body::empty());
        *out.status_mut() = rsp.status();
        *out.version_mut() = rsp.version();
        *out.headers_mut() = rsp.headers().clone();
        *out.body_mut() = Body::from_stream(rsp.bytes_stream());
        Ok(out)
    }
}

#[async_trait]
impl RoundTrip for RawTransport {
    async fn round_trip(
        &self,
        req: http::Request<Body>,
    ) -> std::result::Result<http::Response<Body>, BoxError> {
        self.execute(req).await.map_err(Into::into)
    }
}

impl fmt::Debug for RawTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawTransport")
            .field("config", &self.config)
            .field("insecure", &self.insecure)
            .field("clients", &self.clients.len())
            .finish()
    }
}

/// The default transport paired with its skip-verify twin.
#[derive(Clone)]
pub struct Transports {
    default: Arc<dyn RoundTrip>,
    insecure: Arc<dyn RoundTrip>,
}

impl Transports {
    /// Build both transports with ambient proxy settings from the environment.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        Self::with_resolver(config, Arc::new(ProxyResolver::from_env()))
    }

    /// Build both transports sharing `resolver`.
    pub fn with_resolver(config: &TransportConfig, resolver: Arc<ProxyResolver>) -> Result<Self> {
        Ok(Self {
            default: Arc::new(RawTransport::new(config.clone(), false, resolver.clone())?),
            insecure: Arc::new(RawTransport::new(config.clone(), true, resolver)?),
        })
    }

    /// Pair two existing transports.
    pub fn from_parts(default: Arc<dyn RoundTrip>, insecure: Arc<dyn RoundTrip>) -> Self {
        Self { default, insecure }
    }

    /// Use the same transport for both roles.
    pub fn single(transport: Arc<dyn RoundTrip>) -> Self {
        Self::from_parts(transport.clone(), transport)
    }

    /// The verifying transport.
    pub fn default_transport(&self) -> &Arc<dyn RoundTrip> {
        &self.default
    }

    /// The transport for a call, chosen solely by `insecure_skip_verify`.
    pub fn select(&self, insecure_skip_verify: bool) -> &Arc<dyn RoundTrip> {
        if insecure_skip_verify {
            &self.insecure
        } else {
            &self.default
        }
    }
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transports")
    }
}
