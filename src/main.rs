use ai_llm_service::telemetry;
use anyhow::Context;
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` is optional; real environment variables take precedence.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", Level::INFO))
        .with(telemetry::layer())
        .try_init()
        .context("failed to install tracing subscriber")?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting docs-qa-backend");
    api::start().await.context("server stopped with an error")?;
    Ok(())
}
