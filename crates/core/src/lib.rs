// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared primitives for Outbound clients.
//!
//! This crate defines what every instrumented client needs from its
//! surroundings and nothing more:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`context`] | [`Context`]: per-call deadline and typed marker bag |
//! | [`interceptor`] | [`Interceptor`] pipeline contract, [`CallMeta`], stock interceptors |
//!
//! Concrete clients (see `outbound-http`) accept an interceptor at
//! construction and route every call through it.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod context;
pub mod interceptor;

pub use context::Context;
pub use interceptor::{
    next_inject, BoxError, BoxFuture, CallMeta, Interceptor, Next, NextInject,
    NoopInterceptor, TracingInterceptor,
};
