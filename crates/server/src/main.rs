mod api;
mod app_config;
mod cli;
mod error;
mod pipeline;
mod router;
mod startup;
mod state;
#[cfg(test)]
mod test_support;

use tracing::info;
use tracing_subscriber::EnvFilter;

async fn serve(config: &cidrag_core::Config) -> anyhow::Result<()> {
    let state = startup::build_app_state(config).await?;
    let app = router::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://localhost:{}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let config = app_config::load_config();
    let args: Vec<String> = std::env::args().collect();

    if cli::dispatch(&config, &args).await? {
        return Ok(());
    }

    config.log_summary();
    serve(&config).await
}
