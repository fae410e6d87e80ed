//! Puppetry - desktop input automation MCP server
//!
//! Serves MCP on stdio and the event stream over HTTP.

use std::sync::Arc;

use puppetry::config::Config;
use puppetry::providers::ProviderRegistry;
use puppetry::server::PuppetryServer;
use puppetry::transport::SseTransport;
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr to keep stdout clean for MCP protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Puppetry MCP Server");

    let config = Config::from_env()?;

    let events = SseTransport::new(config.transport.clone());
    let router = puppetry::http::router(&events)?;

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    tracing::info!(
        "Event stream at http://{}{}",
        listener.local_addr()?,
        config.transport.path
    );
    let http = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("HTTP server stopped: {}", e);
        }
    });

    let providers = Arc::new(ProviderRegistry::new(config.providers.clone()));
    let server = PuppetryServer::new(providers, events.clone());

    tracing::info!("Puppetry MCP Server ready, listening on stdio");

    let service = server.serve(stdio()).await?;

    // Wait for graceful shutdown
    service.waiting().await?;

    tracing::info!("Puppetry MCP Server shutting down");
    events.close();
    http.abort();
    Ok(())
}
