use std::sync::Arc;

use anyhow::Context;
use cinebridge_gateway::{Gateway, HttpUpstream, KeyPool};
use cinebridge_metadata::kinopoisk::KinopoiskClient;
use cinebridge_metadata::provider::PrimaryCatalog;
use cinebridge_metadata::resolver::Resolver;
use cinebridge_metadata::tmdb::TmdbClient;
use cinebridge_playback::PlaybackProxy;

use crate::cache::PopularCache;
use crate::config::Config;
use crate::rate_limit::RateLimiter;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    /// `None` when no TMDB key is configured.
    pub primary: Option<Arc<dyn PrimaryCatalog>>,
    pub resolver: Option<Arc<Resolver>>,
    pub playback: PlaybackProxy,
    pub stream_limiter: RateLimiter,
    pub popular: PopularCache,
}

impl AppState {
    /// Wire the resolver from a primary catalog and the gateway-backed secondary catalog.
    pub fn new(
        gateway: Gateway,
        primary: Option<Arc<dyn PrimaryCatalog>>,
        playback: PlaybackProxy,
        stream_limiter: RateLimiter,
    ) -> Self {
        let resolver = primary.as_ref().map(|primary| {
            let secondary = Arc::new(KinopoiskClient::new(gateway.clone()));
            Arc::new(Resolver::new(primary.clone(), secondary))
        });
        Self {
            gateway,
            primary,
            resolver,
            playback,
            stream_limiter,
            popular: PopularCache::default(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()
            .context("failed to build HTTP client")?;

        let gateway = Gateway::new(
            KeyPool::new(config.kp_keys.clone()),
            Arc::new(HttpUpstream::new(config.kp_base_url.clone(), client.clone())),
        );

        let primary = config.tmdb_key.clone().map(|key| {
            Arc::new(TmdbClient::new(key, config.tmdb_language.clone(), client.clone()))
                as Arc<dyn PrimaryCatalog>
        });

        let playback = PlaybackProxy::new(
            client,
            config.player_base_url.clone(),
            config.player_asset_host.clone(),
        );

        let stream_limiter =
            RateLimiter::new(config.stream_rate_limit, config.stream_rate_window_secs);

        Ok(Self::new(gateway, primary, playback, stream_limiter))
    }
}
