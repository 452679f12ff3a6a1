//! prototype-api server binary

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use prototype_api::api::{create_router, AppState, DbDiagnostics};
use prototype_api::auth::AccessGate;
use prototype_api::completion::CompletionClient;
use prototype_api::config::{AppConfig, LogFormat};
use prototype_api::store::StoreConnection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    // Open the store before any request can be routed
    let mut connection = StoreConnection::open(&config.mongo).await;

    let gate = AccessGate::from_config(&config.auth);
    tracing::info!(enabled = gate.is_enabled(), "Access gate resolved");

    let completions = CompletionClient::from_config(&config.openai)
        .context("invalid openai configuration")?;
    if completions.is_none() {
        tracing::info!("OPENAI_API_KEY not set; completion routes disabled");
    }

    let state = AppState::new(connection.handle(), gate)
        .with_completions(completions)
        .with_diagnostics(DbDiagnostics::from_env(|key| std::env::var(key).ok()));

    let router = create_router(state, &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, "Listening for HTTP traffic");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    connection.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("prototype_api=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).try_init()?;
        }
    }

    Ok(())
}
