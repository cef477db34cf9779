use std::net::SocketAddr;

use legal_rag_config::load_settings;
use legal_rag_server::{create_router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config_path = std::env::var("LEGAL_RAG_CONFIG_FILE").ok();
    let settings = load_settings(config_path.as_deref())?;

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let state = AppState::new(settings);
    let router = create_router(state);

    tracing::info!(%addr, "starting legal RAG server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
