//! HTTP adapter mapping for domain errors.
//!
//! Keeps [`Error`] HTTP-agnostic while letting handlers return it directly.
//! Internal errors are redacted before they reach the client.

use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::BadGateway => StatusCode::BAD_GATEWAY,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        let mut redacted = Error::internal("Internal server error");
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(redact_if_internal(self))
    }
}

/// Fallback handler answering unknown routes with the error envelope.
///
/// # Errors
///
/// Always returns [`ErrorCode::NotFound`].
pub async fn route_not_found(req: HttpRequest) -> ApiResult<HttpResponse> {
    Err(Error::not_found(format!("no route for {}", req.path())))
}

#[cfg(test)]
mod tests {
    //! Tests for HTTP error mapping.

    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;
    use serde_json::json;

    const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

    #[rstest]
    #[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
    #[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
    #[case(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(Error::bad_gateway("garbled"), StatusCode::BAD_GATEWAY)]
    #[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
        assert_eq!(ResponseError::status_code(&error), status);
    }

    async fn render(error: &Error) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = ResponseError::error_response(error);
        let status = response.status();
        let trace_id = response
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = to_bytes(response.into_body())
            .await
            .expect("reading response body succeeds");
        let body = serde_json::from_slice(&bytes).expect("error JSON decodes");
        (status, trace_id, body)
    }

    #[actix_web::test]
    async fn internal_errors_are_redacted() {
        let error = Error::internal("db password leaked")
            .with_trace_id(TRACE_ID)
            .with_details(json!({"secret": "x"}));
        let (status, trace_id, body) = render(&error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(trace_id.as_deref(), Some(TRACE_ID));
        assert_eq!(
            body,
            json!({"code": "internal_error", "message": "Internal server error", "traceId": TRACE_ID})
        );
    }

    #[actix_web::test]
    async fn upstream_errors_keep_their_message() {
        let error = Error::service_unavailable("upstream timeout: 30s elapsed")
            .with_details(json!({"reason": "timeout"}));
        let (status, trace_id, body) = render(&error).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(trace_id.is_none());
        assert_eq!(
            body,
            json!({
                "code": "service_unavailable",
                "message": "upstream timeout: 30s elapsed",
                "details": {"reason": "timeout"},
            })
        );
    }
}
