// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered configuration loading.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults;
//! 2. the file passed with `--config` (any format the `config` crate reads);
//! 3. `OUTBOUND_*` environment variables, with `__` separating nested keys,
//!    e.g. `OUTBOUND_TRANSPORT__CONNECT_TIMEOUT_MS=5000`.
//!
//! A `.env` file in the working directory is loaded into the environment
//! first, if present.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use outbound_http::HttpConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "OUTBOUND";

/// Load settings from `path` and the environment.
pub fn load(path: Option<&Path>) -> Result<HttpConfig, ConfigError> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
