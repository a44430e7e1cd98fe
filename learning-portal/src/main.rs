use dotenvy::dotenv;
use learning_portal::config::get_configuration;
use learning_portal::services::lms_client::LmsClient;
use learning_portal::services::metrics::init_metrics;
use learning_portal::startup::build_router;
use learning_portal::AppState;
use portal_core::observability::logging::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "learning-portal",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    )?;

    init_metrics().map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    let client = LmsClient::new(&configuration.api)?;
    info!(base_url = %client.base_url(), "LMS API client ready");

    let state = AppState::new(Arc::new(client), &configuration.server);

    let drafts = state.drafts.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let expired = drafts.sweep();
            if expired > 0 {
                tracing::debug!(expired, open = drafts.len(), "Expired lesson drafts swept");
            }
        }
    });

    let app = build_router(state, &configuration.server);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting learning-portal on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
