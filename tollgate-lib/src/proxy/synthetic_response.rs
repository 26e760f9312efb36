use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::Response;
use serde::Serialize;

use crate::proxy::http_result::{HttpError, HttpResult};

pub(crate) type RespBody = BoxBody<Bytes, hyper::Error>;

/// Body sent when the hard gate rejects a request
pub const TOO_MANY_REQUESTS_BODY: &str = "Too many requests";

/// Body sent when the soft gate rejects a request
pub const BELOW_PERCENTAGE_BODY: &str = "Requests below than percentage";

pub(crate) fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Build a `text/plain` response
pub(crate) fn text_response(
    status: StatusCode,
    text: impl Into<Bytes>,
) -> HttpResult<Response<RespBody>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(full_body(text))
        .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(e.to_string()))
}

/// Build an `application/json` response from any serializable value
pub(crate) fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> HttpResult<Response<RespBody>> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(e.to_string()))?;
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(bytes))
        .map_err(|e| HttpError::FailedToGenerateDownstreamResponse(e.to_string()))
}

pub(crate) fn too_many_requests() -> HttpResult<Response<RespBody>> {
    text_response(StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS_BODY)
}

pub(crate) fn below_percentage() -> HttpResult<Response<RespBody>> {
    text_response(StatusCode::TOO_MANY_REQUESTS, BELOW_PERCENTAGE_BODY)
}

/// Response for a request-scoped failure: its status code and message as plain text.
///
/// Never fails; when even the builder errors, an empty response with the
/// status code is returned.
pub(crate) fn error_response(error: &HttpError) -> Response<RespBody> {
    let status = StatusCode::from(error);
    text_response(status, error.to_string()).unwrap_or_else(|_| {
        let mut resp = Response::new(full_body(Bytes::new()));
        *resp.status_mut() = status;
        resp
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_bodies_are_plain_text_429() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for resp in [too_many_requests()?, below_percentage()?] {
            assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(
                resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
                Some("text/plain; charset=utf-8")
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn json_body_collects_to_bytes() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let resp = json_response(StatusCode::OK, &[1, 2, 3])?;
        let body: Bytes = resp.into_body().collect().await?.to_bytes();
        assert_eq!(body, Bytes::from_static(b"[1,2,3]"));
        Ok(())
    }

    #[test]
    fn error_response_uses_error_status() {
        let resp = error_response(&HttpError::MissingForwardedUrl);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
