// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Client and transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by the default and skip-verify transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// TCP keepalive interval in milliseconds; zero disables keepalive.
    pub tcp_keepalive_ms: u64,
    /// Idle connections kept per host.
    pub max_idle_connections_per_host: usize,
    /// How long an idle connection is kept, in milliseconds.
    pub idle_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            tcp_keepalive_ms: 30_000,
            max_idle_connections_per_host: 100,
            idle_timeout_ms: 90_000,
        }
    }
}

impl TransportConfig {
    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// TCP keepalive, or `None` when disabled.
    pub fn tcp_keepalive(&self) -> Option<Duration> {
        (self.tcp_keepalive_ms > 0).then(|| Duration::from_millis(self.tcp_keepalive_ms))
    }

    /// Idle connection timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Top-level settings for one named client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Component name reported to the interceptor pipeline. Calls made under
    /// `std` go through the installed default client.
    pub name: String,
    /// Transport settings.
    pub transport: TransportConfig,
    /// Log request and response payloads from the tracing interceptor.
    pub log_payloads: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            name: crate::global::STD_NAME.to_owned(),
            transport: TransportConfig::default(),
            log_payloads: false,
        }
    }
}
