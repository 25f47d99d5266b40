//! Marketplace automation bridge - process entry point
//!
//! Startup order mirrors the data flow: listen for the extension first,
//! then expose the tool surface to the LLM client over stdio. Logs go
//! to stderr; stdout carries the tool protocol.

mod service;

use std::sync::Arc;

use anyhow::Context;
use bridge::{Backend, ExtensionRegistry};
use clap::Parser;
use rmcp::{transport::stdio, ServiceExt};
use tools::ToolSet;
use tracing_subscriber::EnvFilter;

use crate::service::BridgeService;

#[derive(Parser, Debug)]
#[command(
    name = "market-bridge",
    about = "Tool server bridging an LLM client to a browser extension for marketplace automation"
)]
struct Cli {
    /// Host for the extension WebSocket listener
    #[arg(long, env = "MCP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port for the extension WebSocket listener
    #[arg(long, env = "MCP_PORT", default_value_t = 5555)]
    port: u16,

    /// Arm anti-detection patches before commands act on the bound tab
    #[arg(
        long,
        env = "STEALTH_MODE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    stealth: bool,

    /// Verbose logging to stderr
    #[arg(long, env = "DEBUG", default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Bind failure is the only fatal startup error.
    let registry = Arc::new(
        ExtensionRegistry::start(&cli.host, cli.port)
            .await
            .context("starting extension listener")?,
    );
    tracing::info!(
        host = %cli.host,
        port = cli.port,
        stealth = cli.stealth,
        "waiting for extension connection"
    );

    let backend = Arc::new(Backend::new(registry.clone(), cli.stealth));
    let service = BridgeService::new(ToolSet::new(backend));

    let running = service
        .serve(stdio())
        .await
        .context("starting tool-protocol transport")?;

    tokio::select! {
        // Client hung up the stdio transport.
        quit = running.waiting() => {
            quit.context("tool-protocol transport")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("termination signal received");
        }
    }

    // Reject anything still pending; nothing may hang across a restart.
    registry.stop().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("SIGTERM handler installs");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
