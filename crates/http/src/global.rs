// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide default client and transport.
//!
//! The defaults are installed once by the composition root, after it has
//! built its interceptor pipeline, so that the installed client and
//! transport carry the final pipeline. Nothing enforces that ordering;
//! installing earlier simply captures whatever interceptor was passed in.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::info;

use crate::client::Client;
use crate::instrumented::InstrumentedTransport;
use crate::pipeline::HttpInterceptor;
use crate::transport::Transports;

/// Component name of the process-wide defaults.
pub const STD_NAME: &str = "std";

static STD: OnceCell<StdHttp> = OnceCell::new();

/// The defaults were already installed.
#[derive(Debug, Error)]
#[error("default HTTP client is already installed")]
pub struct AlreadyInstalled;

/// The default client paired with the default instrumented transport.
#[derive(Debug, Clone)]
pub struct StdHttp {
    client: Client,
    transport: InstrumentedTransport,
}

impl StdHttp {
    /// Build the defaults over `transports`, both named `std`.
    pub fn new(transports: Transports, interceptor: Arc<dyn HttpInterceptor>) -> Self {
        let transport = InstrumentedTransport::new(
            STD_NAME,
            transports.default_transport().clone(),
            interceptor.clone(),
        );
        Self {
            client: Client::new(STD_NAME, transports, interceptor),
            transport,
        }
    }

    /// The default client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The default instrumented transport.
    pub fn transport(&self) -> &InstrumentedTransport {
        &self.transport
    }
}

/// Install the process-wide defaults. Only the first call succeeds.
pub fn install_std(std: StdHttp) -> Result<&'static StdHttp, AlreadyInstalled> {
    let mut installed = false;
    let current = STD.get_or_init(|| {
        installed = true;
        std
    });
    if !installed {
        return Err(AlreadyInstalled);
    }
    info!(name = STD_NAME, "installed default http client");
    Ok(current)
}

/// The installed default client, if any.
pub fn std_client() -> Option<&'static Client> {
    STD.get().map(StdHttp::client)
}

/// The installed default instrumented transport, if any.
pub fn std_transport() -> Option<&'static InstrumentedTransport> {
    STD.get().map(StdHttp::transport)
}
