use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mcp_log_reader::config::{Config, ServerMode};
use mcp_log_reader::http::{serve_alongside, serve_http};
use mcp_log_reader::mcp::run_stdio;
use mcp_log_reader::retriever::LogRetriever;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [config.yaml|json]", args[0]);
        std::process::exit(1);
    }

    let config = match args.get(1) {
        Some(path) => Config::load_from_path(Path::new(path))
            .with_context(|| format!("loading config {path}"))?,
        None => Config::default(),
    }
    .resolve_environment();

    info!(
        "starting {} in {:?} mode, diagnostics at {:?}",
        env!("CARGO_PKG_NAME"),
        config.server.mode,
        config.diagnostics.log_path
    );

    let retriever = Arc::new(LogRetriever::new(&config).context("building log retriever")?);

    match config.server.mode {
        ServerMode::Stdio => run_stdio(retriever).await?,
        ServerMode::Http => serve_http(retriever, &config.server).await?,
        ServerMode::Both => {
            // the process ends when the stdio client disconnects or HTTP fails
            serve_alongside(retriever.clone(), &config.server, run_stdio(retriever)).await?
        }
    }

    Ok(())
}
