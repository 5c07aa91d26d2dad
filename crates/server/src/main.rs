use std::net::SocketAddr;

use anyhow::Context;
use cinebridge_server::config::Config;
use cinebridge_server::routes::build_router;
use cinebridge_server::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    if config.kp_keys.is_empty() {
        warn!("CINEBRIDGE_KP_KEYS is empty, secondary catalog calls will fail");
    }
    if config.tmdb_key.is_none() {
        warn!("CINEBRIDGE_TMDB_KEY is not set, search and watch are disabled");
    }
    if config.player_base_url.is_none() {
        warn!("CINEBRIDGE_PLAYER_BASE_URL is not set, playback relay is disabled");
    }
    info!(
        keys = config.kp_keys.len(),
        kp_base_url = %config.kp_base_url,
        rate_limit = config.stream_rate_limit,
        rate_window_secs = config.stream_rate_window_secs,
        "configuration loaded"
    );

    let app_state = AppState::from_config(&config)?;
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
