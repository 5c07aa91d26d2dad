//! Same-origin relay for the third-party player.

pub mod relay;
pub mod rewrite;

pub use relay::{PlaybackProxy, RelayedAsset, RelayedDocument};
pub use rewrite::{RewriteRules, rewrite_document};

use cinebridge_core::error::ApiError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("player returned {status}")]
    Upstream { status: u16 },
    #[error("network error: {0}")]
    Network(String),
}

impl From<PlaybackError> for ApiError {
    fn from(e: PlaybackError) -> Self {
        match e {
            PlaybackError::NotConfigured(what) => {
                ApiError::ConfigurationMissing(format!("{what} is not configured"))
            }
            PlaybackError::InvalidUrl(url) => ApiError::BadRequest(format!("invalid url: {url}")),
            // Error-class statuses pass through; anything else the player sends back
            // (redirects it would not follow, 1xx) is reported as a gateway failure.
            PlaybackError::Upstream { status } if (400..600).contains(&status) => {
                ApiError::UpstreamStatus {
                    status,
                    message: "failed to load player".into(),
                }
            }
            PlaybackError::Upstream { status } => ApiError::BadGateway {
                message: "failed to load player".into(),
                details: Some(format!("unexpected status {status}")),
            },
            PlaybackError::Network(detail) => ApiError::BadGateway {
                message: "player unreachable".into(),
                details: Some(detail),
            },
        }
    }
}
