//! Switchyard CLI
//!
//! Serves the gateway and runs one-shot directory health checks.
//!
//! ```bash
//! switchyard check --config gateway.json && echo "all healthy"
//! switchyard gateway --config gateway.json --port 8080
//! ```

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use switchyard_client::BackendClient;
use switchyard_gateway::{
    GatewayConfig, GatewayRouter, GatewayState, HealthAggregator, HealthHistory, ServeOptions,
    ServerDirectory,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Switchyard - tool-server gateway and health aggregation
#[derive(Parser, Debug)]
#[command(name = "switchyard", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the gateway with the periodic health monitor
    Gateway(GatewayArgs),
    /// Check every server once, print the report and exit 0 if all are healthy
    Check(CheckArgs),
    /// Load and validate a directory file
    Validate(ConfigArg),
    /// Print the directory listing as JSON
    Servers(ConfigArg),
}

#[derive(Args, Debug)]
struct ConfigArg {
    /// Directory configuration file (JSON)
    #[arg(short, long, env = "SWITCHYARD_CONFIG")]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    config: ConfigArg,

    /// Per-server probe timeout in seconds
    #[arg(long, env = "SWITCHYARD_HEALTH_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Maximum number of probes in flight
    #[arg(long, env = "SWITCHYARD_MAX_CONCURRENCY", default_value_t = 50)]
    max_concurrency: usize,
}

#[derive(Args, Debug)]
struct GatewayArgs {
    #[command(flatten)]
    check: CheckArgs,

    /// Address to bind
    #[arg(long, env = "SWITCHYARD_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on; defaults to `transport.port` from the config file
    #[arg(short, long, env = "SWITCHYARD_PORT")]
    port: Option<u16>,

    /// Bound on each proxied tool call in seconds
    #[arg(long, env = "SWITCHYARD_PROXY_TIMEOUT_SECS", default_value_t = 30)]
    proxy_timeout_secs: u64,

    /// Seconds between periodic health checks; 0 disables the monitor
    #[arg(long, env = "SWITCHYARD_HEALTH_INTERVAL_SECS", default_value_t = 30)]
    health_interval_secs: u64,

    /// Number of reports kept for `/health/history`
    #[arg(long, env = "SWITCHYARD_HISTORY_SIZE", default_value_t = 20)]
    history_size: usize,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long, env = "SWITCHYARD_GRACE_SECS", default_value_t = 10)]
    grace_secs: u64,
}

impl GatewayArgs {
    fn serve_options(&self) -> ServeOptions {
        ServeOptions {
            monitor_interval: match self.health_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            shutdown_grace: Duration::from_secs(self.grace_secs),
        }
    }
}

fn load(path: &Path) -> Result<(GatewayConfig, Arc<ServerDirectory>)> {
    let config = GatewayConfig::from_file(path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;
    let directory = Arc::new(ServerDirectory::load(&config)?);
    Ok((config, directory))
}

fn aggregator(
    directory: &Arc<ServerDirectory>,
    client: BackendClient,
    args: &CheckArgs,
) -> HealthAggregator {
    HealthAggregator::new(Arc::clone(directory), client)
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_max_concurrency(args.max_concurrency)
}

async fn run_gateway(args: GatewayArgs) -> Result<()> {
    let (config, directory) = load(&args.check.config.config)?;
    let client = BackendClient::new()?;
    let router = GatewayRouter::new(Arc::clone(&directory), client.clone());
    let state = GatewayState::new(
        config.name.clone(),
        router,
        aggregator(&directory, client, &args.check),
        Arc::new(HealthHistory::new(args.history_size)),
    )
    .with_config_path(&args.check.config.config)
    .with_proxy_timeout(Duration::from_secs(args.proxy_timeout_secs));

    let port = args.port.unwrap_or(config.transport.port);
    let listener = TcpListener::bind((args.bind.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.bind, port))?;

    switchyard_gateway::serve(state, listener, args.serve_options(), async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    info!(gateway = %config.name, "stopped");
    Ok(())
}

async fn run_check(args: CheckArgs) -> Result<i32> {
    let (_, directory) = load(&args.config.config)?;
    let report = aggregator(&directory, BackendClient::new()?, &args)
        .check_all()
        .await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.exit_code())
}

fn run_validate(args: ConfigArg) -> Result<()> {
    let (config, _) = load(&args.config)?;
    for name in config.server_names() {
        println!("{name}");
    }
    Ok(())
}

fn run_servers(args: ConfigArg) -> Result<()> {
    let (_, directory) = load(&args.config)?;
    let router = GatewayRouter::new(directory, BackendClient::new()?);
    println!("{}", serde_json::to_string_pretty(&router.list_servers())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else {
        "info,switchyard=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Gateway(args) => run_gateway(args).await,
        Command::Check(args) => {
            let code = run_check(args).await?;
            std::process::exit(code)
        }
        Command::Validate(args) => run_validate(args),
        Command::Servers(args) => run_servers(args),
    }
}

// ============================================================================
// Tests
// ============================================================================
