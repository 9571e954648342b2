use mcp_health_server::{api::app_router, build_state, config::Config, init_tracing, shutdown};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env()?;
    let state = build_state(&config).await?;

    let router = app_router(state.clone(), &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to wait for shutdown signal: {}", e);
            }
            tracing::info!("Received Ctrl+C signal");
            // Closing the health stream ends open SSE responses.
            shutdown(&state).await;
        })
        .await?;
    Ok(())
}
