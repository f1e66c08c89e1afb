//! CLI entry point for the fleet feed service.
//!
//! Provides subcommands for serving the aggregated vehicle feed over HTTP,
//! watching a running feed the way a map client does, running a single
//! aggregation cycle, and listing the known operators.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleet_feed::{
    aggregator::FleetAggregator,
    config::Config,
    fetch::BasicClient,
    infra::onebusaway::OneBusAwayClient,
    output::{log_agencies, log_snapshot, to_json},
    poller::{DEFAULT_INTERVAL, HttpFeedSource, LiveFeedPoller},
    server::{AppState, run_server},
    services::transit_api::TransitApi,
};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fleet_feed")]
#[command(about = "Live multi-agency vehicle positions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the aggregated vehicle feed over HTTP
    Serve {
        /// Address to bind
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
    /// Poll an aggregation endpoint and log each refreshed snapshot
    Watch {
        /// Aggregation endpoint to poll
        #[arg(short, long, default_value = "http://localhost:8080/api/vehicles")]
        endpoint: String,

        /// Refresh interval in seconds
        #[arg(short, long, default_value_t = DEFAULT_INTERVAL.as_secs())]
        interval: u64,

        /// Stop after this many snapshots (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value_t = 0)]
        ticks: usize,
    },
    /// Run one aggregation cycle and print the feed as JSON
    Aggregate {
        /// Pretty-print the JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// List the operators known to the upstream provider
    ListAgencies,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Guard must live until exit so buffered log lines are flushed.
    let _file_guard = init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, port } => {
            let state = AppState::new(transit_api()?);
            run_server(state, &bind, port).await?;
        }
        Commands::Watch {
            endpoint,
            interval,
            ticks,
        } => {
            watch(&endpoint, Duration::from_secs(interval.max(1)), ticks).await?;
        }
        Commands::Aggregate { pretty } => {
            let aggregator = FleetAggregator::new(transit_api()?);
            let feed = aggregator.run().await?;
            println!("{}", to_json(&feed.into_response(), pretty)?);
        }
        Commands::ListAgencies => {
            let aggregator = FleetAggregator::new(transit_api()?);
            let agencies = aggregator.directory().list_agencies().await?;
            log_agencies(&agencies);
        }
    }

    Ok(())
}

/// Logging setup: coloured stderr plus a JSON daily-rolling log file.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fleet_feed.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fleet_feed.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

fn transit_api() -> Result<Arc<dyn TransitApi>> {
    let config = Config::from_env();
    if config.api_key.is_none() {
        tracing::warn!("ONEBUSAWAY_API_KEY is not set; upstream calls will fail");
    }
    info!(base_url = %config.base_url, "Using upstream provider");
    Ok(Arc::new(OneBusAwayClient::from_config(&config)?))
}

/// Runs the live poller until `ticks` snapshots were seen or Ctrl+C.
#[tracing::instrument(fields(interval_secs = interval.as_secs()))]
async fn watch(endpoint: &str, interval: Duration, ticks: usize) -> Result<()> {
    let config = Config::from_env();
    let client = BasicClient::with_timeouts(config.request_timeout, config.connect_timeout)?;
    let poller = LiveFeedPoller::new(HttpFeedSource::new(client, endpoint), interval);
    let mut snapshots = poller.subscribe();

    poller.start();
    info!(endpoint, "Watching live feed. Press Ctrl+C to stop.");

    let mut seen = 0;
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                log_snapshot(&snapshot);
                seen += 1;
                if ticks > 0 && seen >= ticks {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    poller.stop();
    Ok(())
}
