use http::StatusCode;
use thiserror::Error;

/// HTTP result type, T is typically a hyper::Response
/// HttpError is used to generate a synthetic error response
pub(crate) type HttpResult<T> = std::result::Result<T, HttpError>;

/// Describes things that can go wrong while serving one request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Missing X-Cf-Forwarded-Url header")]
    MissingForwardedUrl,

    #[error("Invalid forwarded URL: {0}")]
    InvalidForwardedUrl(String),

    #[error("Failed to generate upstream request: {0}")]
    FailedToGenerateUpstreamRequest(String),

    #[error("Failed to get response from upstream: {0}")]
    UpstreamFailed(String),

    #[error("Failed to generate downstream response: {0}")]
    FailedToGenerateDownstreamResponse(String),
}

impl HttpError {
    /// Label used for the `error_type` metric attribute
    pub fn error_type(&self) -> &'static str {
        match self {
            HttpError::MissingForwardedUrl => "missing_forwarded_url",
            HttpError::InvalidForwardedUrl(_) => "invalid_forwarded_url",
            HttpError::FailedToGenerateUpstreamRequest(_) => "upstream_request",
            HttpError::UpstreamFailed(_) => "upstream_failed",
            HttpError::FailedToGenerateDownstreamResponse(_) => "downstream_response",
        }
    }
}

impl From<&HttpError> for StatusCode {
    fn from(e: &HttpError) -> StatusCode {
        match e {
            HttpError::MissingForwardedUrl => StatusCode::BAD_REQUEST,
            HttpError::InvalidForwardedUrl(_) => StatusCode::BAD_REQUEST,
            HttpError::FailedToGenerateUpstreamRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::UpstreamFailed(_) => StatusCode::BAD_GATEWAY,
            HttpError::FailedToGenerateDownstreamResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HttpError> for StatusCode {
    fn from(e: HttpError) -> StatusCode {
        StatusCode::from(&e)
    }
}
