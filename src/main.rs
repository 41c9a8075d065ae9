use anyhow::{Context, Result};
use entity_translator::{server, EntityRegistry, Translator, TranslatorConfig};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("entity_translator=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting entity translator demo service");

    // Load configuration from environment
    let config = TranslatorConfig::from_env()?;
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .context("PORT must be a valid port number")?;

    let registry = EntityRegistry::new().with(server::product_descriptor())?;
    let translator = Arc::new(
        Translator::new(config, registry).context("Failed to initialize translator")?,
    );

    let app = server::router(Arc::clone(&translator));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("{}", translator.metrics().report().format());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
