use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;

use bizdesk_api::app::{AppServices, build_app};
use bizdesk_api::config::AppConfig;
use bizdesk_infra::SessionChange;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    bizdesk_observability::init(config.log_format);

    if config.insecure_jwt_secret {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize services")?;

    // Audit trail for session starts/ends.
    let mut changes = services.identity.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(SessionChange::SignedIn { identity, session_id }) => {
                    tracing::info!(identity_id = %identity.id, %session_id, "session started");
                }
                Ok(SessionChange::SignedOut { identity_id, session_id }) => {
                    tracing::info!(%identity_id, %session_id, "session ended");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "session change log lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
