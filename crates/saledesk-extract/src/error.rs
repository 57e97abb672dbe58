use saledesk_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("navigation to {url} did not complete within {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("rendering proxy did not respond within {timeout_secs}s")]
    RenderTimeout { timeout_secs: u64 },

    #[error("model response could not be parsed: {0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),

    #[error("confidence too low ({confidence} < {floor})")]
    LowConfidence { confidence: u8, floor: u8 },

    #[error("{service} rejected credentials (HTTP {status})")]
    UpstreamAuth { service: &'static str, status: u16 },

    #[error("rate limited by {service} (retry after {retry_after_secs}s)")]
    RateLimited {
        service: &'static str,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {service}")]
    UnexpectedStatus { service: &'static str, status: u16 },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Maps this error onto the caller-facing failure taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            ExtractError::RenderTimeout { .. } => ErrorKind::RenderTimeout,
            ExtractError::Parse(_) => ErrorKind::ParseFailure,
            ExtractError::Validation(_) | ExtractError::InvalidUrl { .. } => {
                ErrorKind::ValidationFailure
            }
            ExtractError::LowConfidence { .. } => ErrorKind::LowConfidence,
            ExtractError::UpstreamAuth { .. } => ErrorKind::UpstreamAuth,
            ExtractError::RateLimited { .. } => ErrorKind::UpstreamRateLimited,
            ExtractError::Http(e) if e.status().is_some_and(|s| s.as_u16() == 429) => {
                ErrorKind::UpstreamRateLimited
            }
            ExtractError::Http(_)
            | ExtractError::UnexpectedStatus { .. }
            | ExtractError::Browser(_)
            | ExtractError::NotConfigured(_) => ErrorKind::UpstreamError,
            ExtractError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_upstream_variants() {
        assert_eq!(
            ExtractError::UpstreamAuth {
                service: "rendering proxy",
                status: 401
            }
            .kind(),
            ErrorKind::UpstreamAuth
        );
        assert_eq!(
            ExtractError::RateLimited {
                service: "model",
                retry_after_secs: 30
            }
            .kind(),
            ErrorKind::UpstreamRateLimited
        );
        assert_eq!(
            ExtractError::UnexpectedStatus {
                service: "model",
                status: 502
            }
            .kind(),
            ErrorKind::UpstreamError
        );
    }

    #[test]
    fn kind_maps_invalid_url_to_validation() {
        let err = ExtractError::InvalidUrl {
            url: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn low_confidence_message_names_floor() {
        let err = ExtractError::LowConfidence {
            confidence: 40,
            floor: 50,
        };
        assert_eq!(err.to_string(), "confidence too low (40 < 50)");
    }
}
