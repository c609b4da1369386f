//! muxrpc: request context inspection tool
//!
//! Builds request contexts and decodes captured header maps the way the
//! framework's multiplexer and transports see them. Output is JSON on stdout;
//! logs go to stderr.
//!
//! Usage:
//!   muxrpc new                                     # Fresh context, generated correlation id
//!   muxrpc new --cid fooid --op-id 7 -H foo=bar    # Context with explicit values
//!   muxrpc inspect '{"_cid":"fooid","_opid":"7"}'  # Decode a header map
//!   muxrpc inspect --file headers.json             # Decode a header map from a file

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use muxrpc_context::{ContextConfig, Headers, RequestContext};
use serde_json::json;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "muxrpc", about = "muxrpc request context inspection tool")]
struct Cli {
    /// Default request timeout written into new contexts (milliseconds)
    #[arg(long, global = true, default_value = "5000")]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a context and print its header snapshot
    New {
        /// Correlation id (generated if omitted)
        #[arg(long, default_value = "")]
        cid: String,

        /// Operation id to assign
        #[arg(long)]
        op_id: Option<u64>,

        /// Extra request header, as key=value (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Decode a JSON object of request headers
    Inspect {
        /// Header map as inline JSON
        json: Option<String>,

        /// Read the header map from a file instead
        #[arg(long, conflicts_with = "json")]
        file: Option<PathBuf>,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

fn load_headers(json: Option<String>, file: Option<PathBuf>) -> Result<Headers> {
    let text = match (json, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Provide a header map as JSON or with --file"),
    };
    serde_json::from_str(&text).context("Header map must be a JSON object of strings")
}

fn run(cli: Cli) -> Result<()> {
    let config = ContextConfig::new().with_default_timeout(Duration::from_millis(cli.timeout_ms));

    match cli.command {
        Command::New { cid, op_id, headers } => {
            let mut ctx = config.new_context(&cid);
            ctx.add_request_headers(headers);
            if let Some(op_id) = op_id {
                ctx.set_op_id(op_id);
            }
            debug!("Built context {}", ctx.correlation_id());
            println!("{}", ctx.snapshot().to_json()?);
        }
        Command::Inspect { json, file } => {
            let headers = load_headers(json, file)?;
            let ctx = RequestContext::from_request_headers(headers, &config)
                .context("Headers cannot be routed")?;
            let snapshot = ctx.snapshot();
            let report = json!({
                "correlationId": ctx.correlation_id(),
                "opId": ctx.op_id()?,
                "timeoutMs": ctx.timeout_ms().ok(),
                "requestHeaders": snapshot.request_headers,
                "responseHeaders": snapshot.response_headers,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}
