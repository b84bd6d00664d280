use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("document too large: {actual} {unit} exceeds limit of {limit}")]
    DocumentTooLarge {
        unit: &'static str,
        actual: u64,
        limit: u64,
    },

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("insufficient input: {0}")]
    InsufficientInput(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn too_large(unit: &'static str, actual: usize, limit: usize) -> Self {
        Self::DocumentTooLarge {
            unit,
            actual: actual as u64,
            limit: limit as u64,
        }
    }
}

/// Failures of the downstream text-completion capability. Every vendor
/// adapter maps its transport and payload errors onto these variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider rate limited the request")]
    RateLimited,

    #[error("provider rejected the credentials")]
    AuthFailed,

    #[error("provider request timed out")]
    Timeout,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Whether a caller may reasonably retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout)
    }

    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimited,
            401 | 403 => Self::AuthFailed,
            408 | 504 => Self::Timeout,
            _ => Self::Unavailable(format!("status {status}")),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::MalformedResponse(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status)
        } else {
            Self::Unavailable(error.to_string())
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_onto_provider_taxonomy() {
        assert_eq!(
            ProviderError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            ProviderError::RateLimited
        );
        assert_eq!(
            ProviderError::from_status(reqwest::StatusCode::UNAUTHORIZED),
            ProviderError::AuthFailed
        );
        assert_eq!(
            ProviderError::from_status(reqwest::StatusCode::GATEWAY_TIMEOUT),
            ProviderError::Timeout
        );
        assert!(matches!(
            ProviderError::from_status(reqwest::StatusCode::BAD_GATEWAY),
            ProviderError::Unavailable(_)
        ));
    }

    #[test]
    fn too_large_message_names_limit() {
        let error = PipelineError::too_large("pages", 80, 50);
        assert_eq!(
            error.to_string(),
            "document too large: 80 pages exceeds limit of 50"
        );
    }
}
