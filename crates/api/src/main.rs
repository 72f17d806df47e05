use std::net::SocketAddr;

use anyhow::Result;
use guardian_api::build_app;
use guardian_api::config::ApiConfig;
use guardian_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("guardian_api");

    let config = ApiConfig::from_env();
    let app = build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(
        bind = %config.bind,
        vision_url = %config.vision_url,
        "guardian assistant api started"
    );

    axum::serve(
        listener,
        app.router
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    app.abort_background_tasks();
    tracing::info!("guardian assistant api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
