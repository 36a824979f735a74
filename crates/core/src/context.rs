// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-call context.
//!
//! A [`Context`] travels with one outbound call. It carries an optional
//! deadline and a typed value bag backed by [`http::Extensions`], so markers
//! attached by one layer (the client, an interceptor) can be read by another
//! (the transport) without any ambient global state.
//!
//! Marker types are expected to be private to the crate that defines them;
//! only that crate's accessor functions can then read or write the marker.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use outbound_core::Context;
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(5));
//! assert!(ctx.deadline().is_some());
//! ```

use std::time::Duration;

use http::Extensions;
use tokio::time::Instant;

/// Deadline marker stored alongside the other values so it survives a trip
/// through request extensions.
#[derive(Debug, Clone, Copy)]
struct Deadline(Instant);

/// Typed value bag and deadline for a single call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    extensions: Extensions,
}

impl Context {
    /// An empty context with no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Rebuild a context from extensions previously produced by
    /// [`Context::into_extensions`] (typically a request's extensions).
    pub fn from_extensions(extensions: Extensions) -> Self {
        Self { extensions }
    }

    /// Borrow the underlying extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Consume the context, yielding its extensions.
    pub fn into_extensions(self) -> Extensions {
        self.extensions
    }

    /// Returns a context whose deadline is the earlier of the current one
    /// and `deadline`. A deadline is never widened.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        let effective = match self.deadline() {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        self.extensions.insert(Deadline(effective));
        self
    }

    /// Returns a context that expires `timeout` from now, or earlier if the
    /// current deadline is already sooner.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.extensions.get::<Deadline>().map(|d| d.0)
    }

    /// Attach a value, replacing any previous value of the same type.
    pub fn with_value<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// Look up a value by type.
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.extensions.get::<T>()
    }

    /// Whether a value of type `T` is present.
    pub fn contains<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(&'static str);

    #[test]
    fn test_background_has_no_deadline() {
        assert!(Context::background().deadline().is_none());
    }

    #[test]
    fn test_deadline_is_never_widened() {
        let soon = Instant::now() + Duration::from_millis(10);
        let ctx = Context::background()
            .with_deadline(soon)
            .with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(soon));
    }

    #[test]
    fn test_deadline_is_narrowed() {
        let late = Instant::now() + Duration::from_secs(60);
        let ctx = Context::background()
            .with_deadline(late)
            .with_timeout(Duration::from_millis(5));
        assert!(ctx.deadline().unwrap() < late);
    }

    #[test]
    fn test_values_survive_extension_round_trip() {
        let ctx = Context::background()
            .with_value(Marker("a"))
            .with_timeout(Duration::from_secs(1));
        let deadline = ctx.deadline();

        let restored = Context::from_extensions(ctx.into_extensions());
        assert_eq!(restored.get::<Marker>(), Some(&Marker("a")));
        assert_eq!(restored.deadline(), deadline);
        assert!(!restored.contains::<String>());
    }
}
