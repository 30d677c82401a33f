use chatbot_bridge::config::Config;
use chatbot_bridge::{AppState, build_router};
use clap::Parser as _;
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse().validate()?;

    // Check configuration on startup. Missing secrets are loud but not
    // fatal: /health and /config still have to answer.
    if config.api_key.is_none() {
        error!("VEXT_API_KEY environment variable not set!");
    }
    if config.channel_token.is_none() {
        error!("CHANNEL_TOKEN environment variable not set!");
    }
    if config.secrets_configured() {
        info!("Configuration loaded successfully");
    }
    info!("Environment: {}", config.environment);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let app_state = AppState::new(config);
    let router = build_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Chatbot bridge listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
