use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Upstream returned {status} for {url}: {body}")]
    UpstreamFetchFailed {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("Unexpected upstream response format: {0}")]
    UpstreamFormat(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gave up after {0} pages - upstream keeps advertising a next page")]
    PageLimitExceeded(usize),

    #[error("Next-page cursor points off the original host: {0}")]
    CrossOriginCursor(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    pub fn from_status(status: StatusCode, url: &str, body: &str) -> Self {
        ApiError::UpstreamFetchFailed {
            status,
            url: url.to_string(),
            body: Self::truncate_body(body),
        }
    }

    /// HTTP status reported by upstream, if this error carries one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::UpstreamFetchFailed { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}
