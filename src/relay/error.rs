use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };

use crate::config::ConfigError;
use crate::llm::BoxError;
use crate::models::relay::ErrorBody;

pub const RATE_LIMITED_MESSAGE: &str = "Rate limits exceeded. Try again in a moment.";
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "AI credits exhausted. Contact support.";
pub const UNAVAILABLE_MESSAGE: &str = "AI service temporarily unavailable";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("upstream rate limit reached")]
    RateLimited,
    #[error("upstream credits exhausted")]
    QuotaExhausted,
    #[error("upstream returned {status}: {body}")]
    Upstream {
        status: u16,
        body: String,
    },
    #[error("failed to reach upstream: {0}")]
    Transport(#[source] BoxError),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,
            RelayError::Configuration(_) | RelayError::Upstream { .. } | RelayError::Transport(_) =>
                StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the caller. Internal detail never leaves the process.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::BadRequest(reason) => reason.clone(),
            RelayError::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            RelayError::QuotaExhausted => QUOTA_EXHAUSTED_MESSAGE.to_string(),
            RelayError::Configuration(_) | RelayError::Upstream { .. } | RelayError::Transport(_) =>
                UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::new(self.public_message()))).into_response()
    }
}
