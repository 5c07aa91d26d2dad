use std::time::Duration;

use anyhow::{Context, bail};
use cinebridge_playback::rewrite::AssetOrigin;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_KP_BASE_URL: &str = "https://kinopoiskapiunofficial.tech";
pub const DEFAULT_TMDB_LANGUAGE: &str = "ru-RU";

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub kp_keys: Vec<String>,
    pub kp_base_url: String,
    pub tmdb_key: Option<String>,
    pub tmdb_language: String,
    pub player_base_url: Option<String>,
    pub player_asset_host: Option<String>,
    pub stream_rate_limit: u64,
    pub stream_rate_window_secs: u64,
    pub upstream_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            kp_keys: Vec::new(),
            kp_base_url: DEFAULT_KP_BASE_URL.to_string(),
            tmdb_key: None,
            tmdb_language: DEFAULT_TMDB_LANGUAGE.to_string(),
            player_base_url: None,
            player_asset_host: None,
            stream_rate_limit: 20,
            stream_rate_window_secs: 60,
            upstream_timeout_secs: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let kp_keys = get("CINEBRIDGE_KP_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            bind: get("CINEBRIDGE_BIND").unwrap_or(defaults.bind),
            kp_keys,
            kp_base_url: get("CINEBRIDGE_KP_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.kp_base_url),
            tmdb_key: get("CINEBRIDGE_TMDB_KEY"),
            tmdb_language: get("CINEBRIDGE_TMDB_LANGUAGE").unwrap_or(defaults.tmdb_language),
            player_base_url: get("CINEBRIDGE_PLAYER_BASE_URL"),
            player_asset_host: get("CINEBRIDGE_PLAYER_ASSET_HOST"),
            stream_rate_limit: parse_number(
                "CINEBRIDGE_STREAM_RATE_LIMIT",
                get("CINEBRIDGE_STREAM_RATE_LIMIT"),
                defaults.stream_rate_limit,
            )?,
            stream_rate_window_secs: parse_number(
                "CINEBRIDGE_STREAM_RATE_WINDOW_SECS",
                get("CINEBRIDGE_STREAM_RATE_WINDOW_SECS"),
                defaults.stream_rate_window_secs,
            )?,
            upstream_timeout_secs: parse_number(
                "CINEBRIDGE_UPSTREAM_TIMEOUT_SECS",
                get("CINEBRIDGE_UPSTREAM_TIMEOUT_SECS"),
                defaults.upstream_timeout_secs,
            )?,
        };

        if config.stream_rate_limit == 0 {
            bail!("CINEBRIDGE_STREAM_RATE_LIMIT must be greater than zero");
        }
        if config.stream_rate_window_secs == 0 {
            bail!("CINEBRIDGE_STREAM_RATE_WINDOW_SECS must be greater than zero");
        }
        if config.upstream_timeout_secs == 0 {
            bail!("CINEBRIDGE_UPSTREAM_TIMEOUT_SECS must be greater than zero");
        }
        if let Some(raw) = &config.player_asset_host {
            if AssetOrigin::parse(raw).is_none() {
                bail!(
                    "CINEBRIDGE_PLAYER_ASSET_HOST must be a host or an http(s) origin, got {raw:?}"
                );
            }
        }

        Ok(config)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn parse_number(name: &str, raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .with_context(|| format!("{name} must be a non-negative integer, got {v:?}")),
    }
}
