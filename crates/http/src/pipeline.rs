// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! The interceptor shapes this crate calls into.

use outbound_core::Interceptor;

use crate::dispatch::DispatchRequest;
use crate::instrumented::{RoundTripRequest, RoundTripResponse};
use crate::response::Response;

/// Component family reported in every [`outbound_core::CallMeta`] built here.
pub const COMPONENT_TYPE: &str = "http";

/// An interceptor able to wrap both client calls and raw round trips.
///
/// Implemented automatically for any type implementing both
/// [`Interceptor`] shapes, including [`outbound_core::NoopInterceptor`] and
/// [`outbound_core::TracingInterceptor`].
pub trait HttpInterceptor:
    Interceptor<DispatchRequest, Response> + Interceptor<RoundTripRequest, RoundTripResponse>
{
}

impl<T> HttpInterceptor for T where
    T: Interceptor<DispatchRequest, Response>
        + Interceptor<RoundTripRequest, RoundTripResponse>
        + ?Sized
{
}
