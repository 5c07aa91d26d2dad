//! Key-rotation gateway in front of the secondary catalog API.
//!
//! Every call walks the key pool in a fresh order until one key succeeds.
//! Quota exhaustion (402/429) and 404 stop the walk: the former is
//! account-wide, the latter means the path itself is wrong.

pub mod gateway;
pub mod pool;
pub mod upstream;

pub use gateway::Gateway;
pub use pool::{DeclaredOrder, KeyOrder, KeyPool, ShuffledOrder};
pub use upstream::{HttpUpstream, TransportError, Upstream, UpstreamResponse};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no API keys configured")]
    NoKeysConfigured,
    #[error("API quota exceeded")]
    QuotaExceeded { details: Option<String> },
    #[error("upstream resource not found")]
    UpstreamNotFound { details: Option<String> },
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
}

impl From<GatewayError> for cinebridge_core::error::ApiError {
    fn from(e: GatewayError) -> Self {
        use cinebridge_core::error::ApiError;
        match e {
            GatewayError::NoKeysConfigured => {
                ApiError::ConfigurationMissing("no API keys configured".into())
            }
            GatewayError::QuotaExceeded { details } => ApiError::QuotaExceeded { details },
            GatewayError::UpstreamNotFound { details } => ApiError::UpstreamNotFound { details },
            GatewayError::UpstreamFailure(detail) => ApiError::BadGateway {
                message: "secondary catalog API failed (check endpoint or keys)".into(),
                details: Some(detail),
            },
        }
    }
}
