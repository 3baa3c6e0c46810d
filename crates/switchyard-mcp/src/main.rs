//! Demo protocol server exposing `echo` and `sum`.
//!
//! Useful as a local backend when exercising the gateway:
//!
//! ```bash
//! switchyard-mcp --name demo --port 8101
//! ```

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use switchyard_mcp::{
    HandlerError, Parameters, ProtocolServer, ServerConfig, ToolDefinition, ToolRegistry,
    parse_params,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "switchyard-mcp", version, about = "Demo Switchyard tool server")]
struct Args {
    /// Server name reported by the metrics tool
    #[arg(long, default_value = "demo")]
    name: String,

    /// Address to bind
    #[arg(long, env = "SWITCHYARD_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, env = "SWITCHYARD_PORT", default_value_t = 8101)]
    port: u16,

    /// Seconds between self-health checks
    #[arg(long, env = "SWITCHYARD_HEALTH_INTERVAL_SECS", default_value_t = 30)]
    health_interval_secs: u64,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long, env = "SWITCHYARD_GRACE_SECS", default_value_t = 10)]
    grace_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
struct SumArgs {
    numbers: Vec<f64>,
}

fn demo_registry() -> switchyard_mcp::Result<ToolRegistry> {
    ToolRegistry::from_definitions(vec![
        ToolDefinition::from_fn(
            "echo",
            "Return the parameters unchanged",
            json!({"type": "object"}),
            |params: Parameters| Ok(Value::Object(params)),
        )
        .in_module("demo"),
        ToolDefinition::from_async(
            "sum",
            "Add a list of numbers",
            json!({
                "type": "object",
                "properties": {"numbers": {"type": "array", "items": {"type": "number"}}},
                "required": ["numbers"]
            }),
            |params: Parameters| async move {
                let args: SumArgs = parse_params(params)?;
                Ok::<Value, HandlerError>(json!(args.numbers.iter().sum::<f64>()))
            },
        )
        .in_module("demo"),
    ])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
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

    let config = ServerConfig::new(&args.name)
        .with_port(args.port)
        .with_health_check_interval(Duration::from_secs(args.health_interval_secs))
        .with_shutdown_grace(Duration::from_secs(args.grace_secs));
    let server = Arc::new(ProtocolServer::new(config, demo_registry()?)?);

    let listener = TcpListener::bind((args.bind.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.bind, args.port))?;

    switchyard_mcp::serve(server, listener, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}
