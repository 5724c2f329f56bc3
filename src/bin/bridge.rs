//! `influx-bridge` Binary
//!
//! Executes one ORM request, described as JSON, against the store and prints
//! the response envelope.
//!
//! ## Usage
//!
//! ```bash
//! # Run the request's own text
//! cargo run --bin influx-bridge -- --request req.json
//!
//! # Override the text to submit
//! cargo run --bin influx-bridge -- --request req.json --text "SELECT * FROM cpu"
//! ```
//!
//! `req.json`:
//! ```json
//! {"uri": "http://localhost:8086", "account": "admin", "password": "secret",
//!  "schema": "metrics", "method": "GET", "text": "SELECT * FROM cpu LIMIT 5"}
//! ```

use anyhow::Context;
use clap::Parser;
use influx_bridge::config::LoggingConfig;
use influx_bridge::{Bridge, Config, RequestConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

const DEFAULT_TRACE_FILE: &str = "ib_trace.log";

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Execute an ORM request against an InfluxDB store
#[derive(Debug, Parser)]
#[command(name = "influx-bridge", version)]
struct Args {
    /// JSON file describing the request
    #[arg(short, long)]
    request: PathBuf,

    /// Query or line-protocol text, overriding the request's own
    #[arg(short, long)]
    text: Option<String>,

    /// Pass the lenient typing hint through to the query path
    #[arg(long)]
    lenient: bool,

    /// Configuration file (defaults to config.toml / config.local.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Print the envelope as indented JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {path}"))?,
        None => Config::load().unwrap_or_else(|_| Config::default()),
    };

    if let Some(settings) = TraceSettings::from_env(&config.logging) {
        if let Err(e) = init_tracing(&settings) {
            eprintln!("WARN: tracing disabled: {e:#}");
        }
    }

    let raw = std::fs::read_to_string(&args.request)
        .with_context(|| format!("reading {}", args.request.display()))?;
    let request: RequestConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.request.display()))?;

    let bridge = Bridge::from_config(&config)?;
    let outcome = bridge
        .execute(&request, args.text.as_deref(), args.lenient)
        .await;

    for (endpoint, e) in bridge.shutdown().await {
        eprintln!("WARN: closing client for {endpoint} failed: {e}");
    }

    let envelope = outcome?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{rendered}");
    Ok(())
}

/// Trace output resolved from `IB_TRACE*` variables layered over `[logging]`.
#[derive(Debug)]
struct TraceSettings {
    path: PathBuf,
    logging: LoggingConfig,
}

impl TraceSettings {
    fn from_env(logging: &LoggingConfig) -> Option<Self> {
        Self::resolve(logging, |name| env::var(name).ok())
    }

    /// `None` unless `IB_TRACE` is set to something other than "0".
    fn resolve(logging: &LoggingConfig, lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        if !lookup("IB_TRACE").is_some_and(|v| v != "0") {
            return None;
        }

        let mut logging = logging.clone();
        if let Some(level) = lookup("IB_TRACE_LEVEL") {
            logging.level = level;
        }
        if let Some(json) = lookup("IB_TRACE_JSON") {
            logging.format = if json == "0" { "text" } else { "json" }.to_string();
        }
        let path = lookup("IB_TRACE_FILE").map_or_else(|| PathBuf::from(DEFAULT_TRACE_FILE), PathBuf::from);

        Some(TraceSettings { path, logging })
    }
}

fn init_tracing(settings: &TraceSettings) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.path)
        .with_context(|| format!("opening trace file {}", settings.path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = TRACE_GUARD.set(guard);

    let filter = EnvFilter::try_new(settings.logging.filter_directive())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let events = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_writer(writer);
    let events: Box<dyn Layer<Registry> + Send + Sync> = if settings.logging.is_json() {
        events.json().boxed()
    } else {
        events.compact().boxed()
    };

    tracing_subscriber::registry()
        .with(events)
        .with(filter)
        .try_init()?;
    Ok(())
}
