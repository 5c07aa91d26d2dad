use serde::Serialize;
use thiserror::Error;

/// Unified API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("API quota exceeded, try again later")]
    QuotaExceeded { details: Option<String> },

    #[error("upstream resource not found")]
    UpstreamNotFound { details: Option<String> },

    #[error("{message}")]
    BadGateway {
        message: String,
        details: Option<String>,
    },

    /// Upstream answered with a non-success status that is passed through as-is.
    #[error("{message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("too many requests")]
    TooManyRequests { retry_after_secs: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::UpstreamNotFound { .. } => "upstream_not_found",
            Self::BadGateway { .. } => "upstream_failure",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::TooManyRequests { .. } => "too_many_requests",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::ConfigurationMissing(_) => 500,
            Self::QuotaExceeded { .. } => 429,
            Self::UpstreamNotFound { .. } => 404,
            Self::BadGateway { .. } => 502,
            Self::UpstreamStatus { status, .. } => *status,
            Self::TooManyRequests { .. } => 429,
            Self::Internal(_) => 500,
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::QuotaExceeded { details }
            | Self::UpstreamNotFound { details }
            | Self::BadGateway { details, .. } => details
                .as_ref()
                .map(|d| serde_json::Value::String(d.clone())),
            Self::TooManyRequests { retry_after_secs } => {
                Some(serde_json::json!({ "retry_after_seconds": retry_after_secs }))
            }
            _ => None,
        }
    }
}

/// JSON error body: `{ "error": "…", "code": "…", "details": … }`.
/// `details` is omitted when there is nothing to add.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(e: &ApiError) -> Self {
        Self {
            error: e.to_string(),
            code: e.code().to_string(),
            details: e.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_envelope_carries_details() {
        let err = ApiError::QuotaExceeded {
            details: Some("daily limit".into()),
        };
        assert_eq!(err.status_code(), 429);
        let json = serde_json::to_value(ErrorEnvelope::from(&err)).unwrap();
        assert_eq!(json["code"], "quota_exceeded");
        assert_eq!(json["details"], "daily limit");
    }

    #[test]
    fn details_are_omitted_when_absent() {
        let err = ApiError::BadRequest("missing path".into());
        let json = serde_json::to_value(ErrorEnvelope::from(&err)).unwrap();
        assert_eq!(json["error"], "bad request: missing path");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn upstream_status_is_passed_through() {
        let err = ApiError::UpstreamStatus {
            status: 403,
            message: "failed to load player".into(),
        };
        assert_eq!(err.status_code(), 403);
    }
}
