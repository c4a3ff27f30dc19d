mod page;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shared::{Config, Pipeline};
use tracing_subscriber::EnvFilter;

use crate::server::{run_server, AppState};

#[derive(Parser)]
#[command(name = "research-studio")]
#[command(about = "Research a topic, summarize the findings, and draft LinkedIn posts from them")]
struct Args {
    /// Address to serve the studio on
    #[arg(short, long, default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// Log filter, e.g. "info" or "shared=debug,tower_http=debug". RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// `RUST_LOG` wins over `--log-level` when it is set and parses.
fn log_filter(rust_log: Option<&str>, log_level: &str) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(log_level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing(log_level: &str) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), log_level))
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    // Fails on a missing API key before anything touches the network
    let config = Config::from_env().context("Failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config).context("Failed to set up the research pipeline")?;

    let state = Arc::new(AppState::new(
        pipeline,
        config.llm.model.clone(),
        config.research_days_back,
    ));

    println!("✓ Research studio running at http://{}", args.bind);
    run_server(state, args.bind).await
}
