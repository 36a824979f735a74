// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Multi-value containers for request headers and query parameters.
//!
//! Keys are canonicalized once, on insertion. Inserting an existing key
//! appends a value; it never overwrites unless [`Header::set`] /
//! [`Params::set`] is used. Both maps iterate in key order so that encoding
//! is deterministic.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{HttpError, Result};

macro_rules! multi_value_map {
    (
        $(#[$attr:meta])*
        $name:ident, $canonicalize:path
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name(BTreeMap<String, Vec<String>>);

        impl $name {
            /// Creates an empty map.
            pub fn new() -> Self {
                Self::default()
            }

            /// Appends `value` to the values stored under `key`.
            pub fn add(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
                self.0
                    .entry($canonicalize(key.as_ref()))
                    .or_default()
                    .push(value.into());
            }

            /// Replaces every value stored under `key` with `value`.
            pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
                self.0
                    .insert($canonicalize(key.as_ref()), vec![value.into()]);
            }

            /// Returns the first value stored under `key`.
            pub fn get(&self, key: &str) -> Option<&str> {
                self.0
                    .get(&$canonicalize(key))
                    .and_then(|values| values.first())
                    .map(String::as_str)
            }

            /// Returns every value stored under `key`, in insertion order.
            pub fn values(&self, key: &str) -> &[String] {
                self.0
                    .get(&$canonicalize(key))
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
            }

            /// Removes `key`, returning its values.
            pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
                self.0.remove(&$canonicalize(key))
            }

            /// Whether `key` has at least one value.
            pub fn contains_key(&self, key: &str) -> bool {
                self.0.contains_key(&$canonicalize(key))
            }

            /// Number of distinct keys.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Whether the map has no keys.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Iterates keys in order together with their values.
            pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
                self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
            }
        }

        impl<K, V> Extend<(K, V)> for $name
        where
            K: AsRef<str>,
            V: Into<String>,
        {
            fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
                for (key, value) in iter {
                    self.add(key, value);
                }
            }
        }

        impl<K, V> FromIterator<(K, V)> for $name
        where
            K: AsRef<str>,
            V: Into<String>,
        {
            fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
                let mut map = Self::new();
                map.extend(iter);
                map
            }
        }
    };
}

multi_value_map! {
    /// Request or response header map with case-insensitive keys.
    ///
    /// Keys are stored in canonical MIME form: `content-type` becomes
    /// `Content-Type`.
    Header, canonical_header_key
}

multi_value_map! {
    /// URL query parameters.
    ///
    /// Keys are kept verbatim because query keys are case-sensitive on the
    /// wire.
    Params, verbatim_key
}

/// Canonical MIME header form. Keys containing bytes that are not valid in
/// a header token are returned unchanged.
pub fn canonical_header_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_owned();
    }

    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn verbatim_key(key: &str) -> String {
    key.to_owned()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

impl Header {
    /// Convert to an `http` header map for dispatch.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (key, values) in self.iter() {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| HttpError::InvalidRequest(format!("header {key:?}: {e}")))?;
            for value in values {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| HttpError::InvalidRequest(format!("header {key:?}: {e}")))?;
                map.append(name.clone(), value);
            }
        }
        Ok(map)
    }
}

impl From<&HeaderMap> for Header {
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}

impl Params {
    /// Parse a raw (already percent-encoded) query string.
    pub fn from_query(query: Option<&str>) -> Self {
        query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// Encode as a query string, keys in order.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in self.iter() {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}
