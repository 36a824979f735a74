// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Instrumented HTTP client core.
//!
//! A [`Client`] turns an option-driven [`Request`] into exactly one outgoing
//! body stream, routes the call through the application's interceptor
//! pipeline and hands back a [`Response`] with either a buffered body or a
//! live stream. The same pipeline wraps raw round trips made through an
//! [`InstrumentedTransport`], so other HTTP-speaking components can share
//! one tracing setup.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`values`] | [`Header`] and [`Params`] multi-value maps |
//! | [`request`] | [`Request`], [`RequestOption`] and the `with_*` options |
//! | [`response`] | [`Response`], the [`Uncompressed`] marker |
//! | [`body`] | [`Body`]: empty, buffered or streaming |
//! | [`transport`] | [`RoundTrip`], [`RawTransport`], [`Transports`] |
//! | [`instrumented`] | [`InstrumentedTransport`] and its pipeline payloads |
//! | [`proxy`] | Per-request proxy resolution |
//! | [`markers`] | Opt-out and proxy override context markers |
//! | [`global`] | Process-wide default client and transport |
//! | [`config`] | [`HttpConfig`], [`TransportConfig`] |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use outbound_core::{Context, TracingInterceptor};
//! use outbound_http::request::{with_out_json, with_timeout};
//! use outbound_http::{Client, TransportConfig, Transports};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transports = Transports::new(&TransportConfig::default())?;
//! let client = Client::new("catalog", transports, Arc::new(TracingInterceptor::new()));
//!
//! let mut items: Vec<String> = Vec::new();
//! let rsp = client
//!     .get(
//!         &Context::background(),
//!         "https://catalog.internal/items",
//!         [with_timeout(Duration::from_secs(2)), with_out_json(&mut items)],
//!     )
//!     .await?;
//! assert!(rsp.is_success());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod body;
pub mod client;
pub mod config;
mod decode;
mod dispatch;
pub mod error;
pub mod global;
pub mod instrumented;
pub mod markers;
mod pipeline;
pub mod proxy;
pub mod request;
mod resolve;
pub mod response;
pub mod transport;
pub mod values;

pub use body::Body;
pub use client::Client;
pub use config::{HttpConfig, TransportConfig};
pub use dispatch::DispatchRequest;
pub use error::{DecodeError, DispatchError, EncodeError, HttpError, ProxyError, Result};
pub use global::{install_std, std_client, std_transport, AlreadyInstalled, StdHttp, STD_NAME};
pub use instrumented::{InstrumentedTransport, RoundTripRequest, RoundTripResponse};
pub use markers::{is_without_interceptors, with_proxy, without_interceptors};
pub use pipeline::{HttpInterceptor, COMPONENT_TYPE};
pub use proxy::{AmbientProxy, NoProxy, ProxyResolver};
pub use request::{Request, RequestOption};
pub use response::{Response, Uncompressed};
pub use transport::{RawTransport, RoundTrip, Transports};
pub use values::{Header, Params};
