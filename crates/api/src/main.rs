use anyhow::Context;

use bau_api::config::{ApiConfig, AuthMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;

    bau_observability::init(config.log_format);

    if config.auth.mode == AuthMode::Disabled {
        tracing::warn!("authentication disabled (local profile); all requests are anonymous");
    } else if config.auth.uses_dev_secret() {
        tracing::warn!("BAU_JWT_SECRET not set; using insecure dev default");
    }

    let verifier = config.auth.build_verifier().await?;
    if let Some(verifier) = &verifier {
        tracing::info!(algorithm = verifier.algorithm(), "bearer token verification enabled");
    }

    let idp = bau_api::idp::from_config(config.cognito.as_ref()).await;

    let app = bau_api::app::build_app(verifier, idp);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
