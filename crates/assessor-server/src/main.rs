//! assessor-server - HTTP API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use assessor_core::{open_store, BackgroundRuntime, EngineConfig, EnrichmentConfig, SystemClock};
use assessor_llm::LlmFactory;
use assessor_server::{create_server, AppState};
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("assessor_server=debug".parse()?),
        )
        .init();

    let host = std::env::var("ASSESSOR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("ASSESSOR_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .context("ASSESSOR_PORT must be a valid port number")?;

    let config = EngineConfig::from_env();
    let enricher = LlmFactory::enricher(&EnrichmentConfig::from_env());
    let store = open_store(&config).context("opening profile store")?;
    let clock = Arc::new(SystemClock);

    let mut runtime = BackgroundRuntime::new(config, store, clock.clone()).await?;
    if let Some(mut deliveries) = runtime.take_delivery_rx() {
        tokio::spawn(async move {
            while let Some((user_id, message)) = deliveries.recv().await {
                info!(
                    user_id,
                    kind = %message.kind,
                    channel = ?message.channel,
                    title = %message.title,
                    "Check-in delivered"
                );
            }
        });
    }
    runtime.start().await?;

    let state = AppState::from_runtime(&runtime, clock, enricher);
    let app = create_server(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting assessor-server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, stopping check-ins...");
        })
        .await?;

    runtime.shutdown().await?;
    info!("Server stopped cleanly");
    Ok(())
}
