use anyhow::Context;

use cargohub_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cargohub_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let (app, services) = cargohub_api::app::build_app_with_services(config.clone()).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        backend = services.backend_name(),
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("server error")?;

    services.shutdown_worker();
    Ok(())
}
