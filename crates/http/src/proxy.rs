// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-request proxy resolution.
//!
//! For each request:
//!
//! 1. An explicit override carried on the call context wins. It is parsed
//!    once and cached under its literal string.
//! 2. Otherwise the ambient configuration applies (`HTTP_PROXY`,
//!    `HTTPS_PROXY`, `NO_PROXY`, upper or lower case).
//!
//! The cache is unbounded and never evicted: distinct proxy strings are
//! bounded by configuration, not by request volume.

use std::net::IpAddr;

use dashmap::DashMap;
use ipnet::IpNet;
use url::{Host, Url};

use crate::error::ProxyError;

/// Schemes accepted for proxy URLs.
pub const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Resolves the proxy for each outgoing request.
#[derive(Debug, Default)]
pub struct ProxyResolver {
    ambient: AmbientProxy,
    cache: DashMap<String, Url>,
}

impl ProxyResolver {
    /// Resolver falling back to `ambient`.
    pub fn new(ambient: AmbientProxy) -> Self {
        Self {
            ambient,
            cache: DashMap::new(),
        }
    }

    /// Resolver falling back to the process environment.
    pub fn from_env() -> Self {
        Self::new(AmbientProxy::from_env())
    }

    /// The proxy to use for `target`, or `None` to connect directly.
    pub fn resolve(
        &self,
        override_proxy: Option<&str>,
        target: &Url,
    ) -> Result<Option<Url>, ProxyError> {
        match override_proxy.filter(|p| !p.is_empty()) {
            Some(raw) => self.parse_cached(raw).map(Some),
            None => self.ambient.proxy_for(target),
        }
    }

    /// Number of cached override strings.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn parse_cached(&self, raw: &str) -> Result<Url, ProxyError> {
        if let Some(url) = self.cache.get(raw) {
            return Ok(url.clone());
        }
        let url = parse_proxy(raw)?;
        // Racing inserts for the same key store equal values.
        self.cache.insert(raw.to_owned(), url.clone());
        Ok(url)
    }
}

/// Parse an explicit proxy override.
pub fn parse_proxy(raw: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(raw).map_err(|source| ProxyError::Invalid {
        raw: raw.to_owned(),
        source,
    })?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(ProxyError::UnsupportedScheme {
            raw: raw.to_owned(),
            scheme: url.scheme().to_owned(),
        });
    }
    Ok(url)
}

/// Proxy settings taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct AmbientProxy {
    http: Option<String>,
    https: Option<String>,
    no_proxy: NoProxy,
}

impl AmbientProxy {
    /// Read `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY` (or their lower-case
    /// forms) from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |upper: &str, lower: &str| {
            lookup(upper)
                .or_else(|| lookup(lower))
                .filter(|v| !v.trim().is_empty())
        };
        Self {
            http: get("HTTP_PROXY", "http_proxy"),
            https: get("HTTPS_PROXY", "https_proxy"),
            no_proxy: NoProxy::parse(&get("NO_PROXY", "no_proxy").unwrap_or_default()),
        }
    }

    /// Proxy for plain `http` targets.
    pub fn with_http(mut self, proxy: impl Into<String>) -> Self {
        self.http = Some(proxy.into());
        self
    }

    /// Proxy for `https` targets.
    pub fn with_https(mut self, proxy: impl Into<String>) -> Self {
        self.https = Some(proxy.into());
        self
    }

    /// Comma-separated hosts that bypass the proxy.
    pub fn with_no_proxy(mut self, no_proxy: &str) -> Self {
        self.no_proxy = NoProxy::parse(no_proxy);
        self
    }

    /// The proxy for `target`, or `None` to connect directly.
    ///
    /// Loopback targets are never proxied. Values without a recognised scheme
    /// are read as `http://<value>`.
    pub fn proxy_for(&self, target: &Url) -> Result<Option<Url>, ProxyError> {
        let Some(host) = target.host() else {
            return Ok(None);
        };
        if is_loopback(&host) {
            return Ok(None);
        }

        let host = host.to_string().to_ascii_lowercase();
        if self.no_proxy.matches(&host, target.port_or_known_default()) {
            return Ok(None);
        }

        let raw = match target.scheme() {
            "https" => self.https.as_deref(),
            "http" => self.http.as_deref(),
            _ => None,
        };
        raw.map(parse_ambient_proxy).transpose()
    }
}

fn parse_ambient_proxy(raw: &str) -> Result<Url, ProxyError> {
    match Url::parse(raw) {
        Ok(url) if SUPPORTED_SCHEMES.contains(&url.scheme()) => Ok(url),
        _ => Url::parse(&format!("http://{raw}")).map_err(|source| ProxyError::Invalid {
            raw: raw.to_owned(),
            source,
        }),
    }
}

fn is_loopback(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => ip.is_loopback(),
        Host::Ipv6(ip) => ip.is_loopback(),
    }
}

/// `NO_PROXY` rules.
///
/// Entries are comma separated. `*` matches every host. An IP address or
/// CIDR block (`10.0.0.0/8`, `fd00::/8`) matches addresses inside it. Any
/// other entry matches that host and its subdomains (a leading dot is
/// optional). An entry with a port only matches that port.
#[derive(Debug, Clone, Default)]
pub struct NoProxy {
    entries: Vec<NoProxyEntry>,
}

#[derive(Debug, Clone)]
enum NoProxyEntry {
    Any,
    Net { net: IpNet, port: Option<u16> },
    Domain { domain: String, port: Option<u16> },
}

impl NoProxyEntry {
    fn parse(entry: &str) -> Self {
        if entry == "*" {
            return Self::Any;
        }
        if let Some(net) = parse_net(entry) {
            return Self::Net { net, port: None };
        }
        let (host, port) = match entry.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                match port.parse::<u16>() {
                    Ok(port) => (host, Some(port)),
                    Err(_) => (entry, None),
                }
            }
            _ => (entry, None),
        };
        match parse_net(host) {
            Some(net) => Self::Net { net, port },
            None => Self::Domain {
                domain: host.trim_start_matches('.').to_owned(),
                port,
            },
        }
    }

    fn matches(&self, host: &str, ip: Option<IpAddr>, port: Option<u16>) -> bool {
        let port_ok = |want: &Option<u16>| want.is_none() || *want == port;
        match self {
            Self::Any => true,
            Self::Net { net, port: want } => {
                port_ok(want) && ip.is_some_and(|ip| net.contains(&ip))
            }
            Self::Domain { domain, port: want } => {
                port_ok(want)
                    && (host == domain
                        || host
                            .strip_suffix(domain.as_str())
                            .is_some_and(|prefix| prefix.ends_with('.')))
            }
        }
    }
}

/// An address or block, with or without brackets. A bare address is a
/// single-host block.
fn parse_net(raw: &str) -> Option<IpNet> {
    let raw = raw.trim_start_matches('[').trim_end_matches(']');
    raw.parse::<IpNet>()
        .ok()
        .or_else(|| raw.parse::<IpAddr>().ok().map(IpNet::from))
}

impl NoProxy {
    /// Parse a comma-separated list.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(|entry| entry.trim().to_ascii_lowercase())
            .filter(|entry| !entry.is_empty())
            .map(|entry| NoProxyEntry::parse(&entry))
            .collect();
        Self { entries }
    }

    /// Whether `host` (lower case, IPv6 in brackets or bare) on `port`
    /// bypasses the proxy.
    pub fn matches(&self, host: &str, port: Option<u16>) -> bool {
        let ip = host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .ok();
        self.entries
            .iter()
            .any(|entry| entry.matches(host, ip, port))
    }
}
