//! Duochat server entry point

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use duochat_runtime::RouterBuilder;
use duochat_server::{Cli, ServerConfig, WebSocketServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_config()?);
        return Ok(());
    }

    // Load configuration, then let flags override it
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load_from_file(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ServerConfig::default(),
    };
    config.apply_cli(&cli);
    config.validate().context("invalid configuration")?;

    // Initialize logging
    setup_logging(config.verbose);
    match &cli.config {
        Some(path) => info!("Loaded configuration from: {}", path),
        None => info!("Using default configuration"),
    }

    let router = RouterBuilder::new()
        .with_config(config.engine.clone())
        .build()?;

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %listener.local_addr()?, "duochat server listening");

    let server = WebSocketServer::new(router.clone(), config.engine.channels.clone());
    tokio::select! {
        result = server.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    info!(stats = ?router.statistics(), "duochat server stopped");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
