use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlideCraftError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("insufficient credits ({remaining} remaining)")]
    InsufficientCredits { remaining: i64 },
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unparsable deck content: {0}")]
    UnparsableContent(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, SlideCraftError>;

/// Closed classification of provider failures. The retry loop only retries
/// `RateLimited`; `Malformed` triggers fallback substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Malformed,
    Other,
}

impl SlideCraftError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Api { status, body } => {
                if *status == reqwest::StatusCode::TOO_MANY_REQUESTS || mentions_rate_limit(body)
                {
                    FailureKind::RateLimited
                } else {
                    FailureKind::Other
                }
            }
            Self::Http(err) => {
                if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
                    FailureKind::RateLimited
                } else {
                    FailureKind::Other
                }
            }
            Self::UnparsableContent(_) | Self::Json(_) => FailureKind::Malformed,
            _ => FailureKind::Other,
        }
    }
}

// Providers are not consistent about 429s; quota errors sometimes arrive as
// 400/403 with an explanatory body.
fn mentions_rate_limit(body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    body.contains("quota") || body.contains("rate limit") || body.contains("rate_limit")
}
