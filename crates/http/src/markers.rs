// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Context markers understood by this crate.
//!
//! The marker types are private; only the functions here can set or read
//! them. Both markers survive the trip from a [`Context`] onto the outgoing
//! request's extensions, so the client and any transport see the same values.

use http::Extensions;
use outbound_core::Context;

#[derive(Debug, Clone, Copy)]
struct WithoutInterceptors;

#[derive(Debug, Clone)]
struct ProxyOverride(String);

/// Mark calls made under `ctx` as uninstrumented: the client and the
/// [`crate::InstrumentedTransport`] go straight to the real transport.
///
/// Use this for calls issued by the interceptor pipeline itself (for
/// example exporting traces over HTTP) so they do not recurse into it.
pub fn without_interceptors(ctx: Context) -> Context {
    ctx.with_value(WithoutInterceptors)
}

/// Whether `ctx` opted out of instrumentation.
pub fn is_without_interceptors(ctx: &Context) -> bool {
    opted_out(ctx.extensions())
}

pub(crate) fn opted_out(extensions: &Extensions) -> bool {
    extensions.get::<WithoutInterceptors>().is_some()
}

/// Route calls made under `ctx` through `proxy`, overriding the ambient
/// proxy configuration. An empty string clears the override.
pub fn with_proxy(ctx: Context, proxy: impl Into<String>) -> Context {
    ctx.with_value(ProxyOverride(proxy.into()))
}

pub(crate) fn proxy_override(extensions: &Extensions) -> Option<&str> {
    extensions
        .get::<ProxyOverride>()
        .map(|p| p.0.as_str())
        .filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_carries_no_markers() {
        let ctx = Context::background();
        assert!(!is_without_interceptors(&ctx));
        assert_eq!(proxy_override(ctx.extensions()), None);
    }

    #[test]
    fn test_markers_round_trip_through_extensions() {
        let ctx = with_proxy(without_interceptors(Context::background()), "http://a");
        let mut req = http::Request::new(());
        req.extensions_mut().extend(ctx.into_extensions());

        assert!(opted_out(req.extensions()));
        assert_eq!(proxy_override(req.extensions()), Some("http://a"));
    }

    #[test]
    fn test_empty_proxy_is_no_override() {
        let ctx = with_proxy(with_proxy(Context::background(), "http://a"), "");
        assert_eq!(proxy_override(ctx.extensions()), None);
    }
}
