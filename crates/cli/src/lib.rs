// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI for Outbound.
//!
//! This crate is the composition root: it loads settings, installs logging,
//! builds the interceptor pipeline, installs the process-wide default client
//! and sends one request from the command line.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use http::Method;
use outbound_core::{Context, TracingInterceptor};
use outbound_http::request::{
    with_header, with_in_body_stream, with_in_json, with_insecure_skip_verify, with_out_is_stream,
    with_params, with_proxy, with_timeout,
};
use outbound_http::{
    install_std, without_interceptors, Client, Header, HttpInterceptor, Params, Request,
    Response, StdHttp, Transports, STD_NAME,
};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Outbound CLI.
#[derive(Parser, Debug)]
#[command(name = "outbound")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML, JSON or TOML).
    #[arg(long, global = true, env = "OUTBOUND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Request to send.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands, one per HTTP method.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a GET request.
    Get(CallArgs),
    /// Send a HEAD request.
    Head(CallArgs),
    /// Send a DELETE request.
    Delete(CallArgs),
    /// Send a POST request.
    Post(CallArgs),
    /// Send a PUT request.
    Put(CallArgs),
    /// Send a PATCH request.
    Patch(CallArgs),
}

impl Commands {
    fn split(self) -> (Method, CallArgs) {
        match self {
            Commands::Get(args) => (Method::GET, args),
            Commands::Head(args) => (Method::HEAD, args),
            Commands::Delete(args) => (Method::DELETE, args),
            Commands::Post(args) => (Method::POST, args),
            Commands::Put(args) => (Method::PUT, args),
            Commands::Patch(args) => (Method::PATCH, args),
        }
    }
}

/// Arguments shared by every method.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Target URL.
    pub url: String,

    /// Request header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Query parameter, `key=value`. Repeatable.
    #[arg(short = 'q', long = "query")]
    pub query: Vec<String>,

    /// Per-call timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Skip TLS certificate verification.
    #[arg(long)]
    pub insecure: bool,

    /// Proxy URL for this call (http, https, socks5, socks5h).
    #[arg(long)]
    pub proxy: Option<String>,

    /// Raw request body.
    #[arg(long, group = "input")]
    pub data: Option<String>,

    /// Stream the request body from a file.
    #[arg(long, group = "input")]
    pub data_file: Option<PathBuf>,

    /// JSON request body; validated and re-encoded.
    #[arg(long, group = "input")]
    pub json: Option<String>,

    /// Copy the response body to stdout as it arrives.
    #[arg(long)]
    pub stream: bool,

    /// Bypass the interceptor pipeline.
    #[arg(long)]
    pub no_instrument: bool,
}

impl CallArgs {
    fn has_body(&self) -> bool {
        self.data.is_some() || self.data_file.is_some() || self.json.is_some()
    }
}

/// Errors in command-line input.
#[derive(Debug, Error)]
pub enum CliError {
    /// A header was not in `Name: value` form.
    #[error("invalid header {0:?}: expected `Name: value`")]
    InvalidHeader(String),

    /// A query parameter was not in `key=value` form.
    #[error("invalid query parameter {0:?}: expected `key=value`")]
    InvalidQuery(String),

    /// A body was given for a method that does not carry one.
    #[error("{0} requests do not take a body")]
    BodyNotAllowed(Method),
}

/// Parse repeated `Name: value` arguments.
pub fn parse_headers(raw: &[String]) -> Result<Header, CliError> {
    raw.iter()
        .map(|h| {
            h.split_once(':')
                .map(|(k, v)| (k.trim(), v.trim().to_owned()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| CliError::InvalidHeader(h.clone()))
        })
        .collect()
}

/// Parse repeated `key=value` arguments.
pub fn parse_query(raw: &[String]) -> Result<Params, CliError> {
    raw.iter()
        .map(|q| {
            q.split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| CliError::InvalidQuery(q.clone()))
        })
        .collect()
}

/// Install the global `tracing` subscriber. `RUST_LOG` selects the filter
/// (default `info`).
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // Already initialised is fine: keep the first subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Run the CLI with the process arguments.
///
/// # Returns
///
/// Returns `Ok(())` once the response has been written, or an error if
/// settings, input or the call itself failed.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(execute(cli))
}

/// Execute a parsed command.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let settings = settings::load(cli.config.as_deref()).context("failed to load settings")?;
    debug!(?settings, "loaded settings");

    let interceptor: Arc<dyn HttpInterceptor> =
        Arc::new(TracingInterceptor::new().with_payloads(settings.log_payloads));
    let transports = Transports::new(&settings.transport)?;
    let defaults = install_std(StdHttp::new(transports, interceptor.clone()))?;
    let client = named_client(&settings.name, defaults, interceptor);

    let (method, args) = cli.command.split();
    if args.has_body() && (method == Method::GET || method == Method::HEAD) {
        return Err(CliError::BodyNotAllowed(method).into());
    }

    let json = args
        .json
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--json is not valid JSON")?;

    let mut header = parse_headers(&args.headers)?;
    if json.is_some() && !header.contains_key("content-type") {
        header.set("content-type", "application/json");
    }

    let body = args.data.clone().unwrap_or_default();
    let mut req = Request::new(method, args.url.clone(), body);
    if !header.is_empty() {
        req.apply([with_header(&header)]);
    }
    if !args.query.is_empty() {
        req.apply([with_params(parse_query(&args.query)?)]);
    }
    if let Some(ms) = args.timeout_ms {
        req.apply([with_timeout(Duration::from_millis(ms))]);
    }
    if args.insecure {
        req.apply([with_insecure_skip_verify()]);
    }
    if let Some(proxy) = &args.proxy {
        req.apply([with_proxy(proxy.clone())]);
    }
    if let Some(path) = &args.data_file {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        req.apply([with_in_body_stream(file)]);
    }
    if let Some(value) = &json {
        req.apply([with_in_json(value)]);
    }
    if args.stream {
        req.apply([with_out_is_stream(true)]);
    }

    let ctx = if args.no_instrument {
        without_interceptors(Context::background())
    } else {
        Context::background()
    };

    let rsp = client.send(&ctx, req).await?;
    info!(status = %rsp.status, "request complete");
    print_response(rsp).await
}

/// The client CLI calls go through: the installed default when `name` is
/// `std`, otherwise one sharing its transports under `name`.
fn named_client(name: &str, defaults: &StdHttp, interceptor: Arc<dyn HttpInterceptor>) -> Client {
    if name == STD_NAME {
        return defaults.client().clone();
    }
    Client::new(name, defaults.client().transports().clone(), interceptor)
}

async fn print_response(rsp: Response) -> anyhow::Result<()> {
    eprintln!("{}", rsp.status);
    for (name, values) in rsp.header.iter() {
        for value in values {
            eprintln!("{name}: {value}");
        }
    }
    eprintln!();

    let mut stdout = tokio::io::stdout();
    match rsp.body_stream {
        Some(mut body) => {
            while let Some(chunk) = body.next().await {
                stdout.write_all(&chunk?).await?;
            }
        }
        None => stdout.write_all(&rsp.body).await?,
    }
    stdout.flush().await?;
    Ok(())
}
