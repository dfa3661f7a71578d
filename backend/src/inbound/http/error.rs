//! Turns murmur's domain [`Error`] into HTTP responses.
//!
//! | code                 | status |
//! |----------------------|--------|
//! | `InvalidRequest`     | 400    |
//! | `Unauthorized`       | 401    |
//! | `Forbidden`          | 403    |
//! | `NotFound`           | 404    |
//! | `Conflict`           | 409    |
//! | `RateLimited`        | 429    |
//! | `ServiceUnavailable` | 503    |
//! | `InternalError`      | 500    |
//!
//! Every body is the [`ErrorBody`] envelope, `{"error": "<message>"}`. A 500
//! always reads `Internal server error`; the real cause is logged where it
//! happened and can be found through the `trace-id` response header. Bad JSON
//! bodies, path segments and query strings are rejected as 400s in the same
//! envelope through [`extractor_error`].

use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use tracing::{debug, error};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

use super::schemas::ErrorBody;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const REDACTED_MESSAGE: &str = "Internal server error";

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The envelope a client sees for `error`.
fn client_body(error: &Error) -> ErrorBody {
    match error.code() {
        ErrorCode::InternalError => ErrorBody {
            error: REDACTED_MESSAGE.to_owned(),
        },
        _ => ErrorBody::from(error),
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            response.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        response.json(client_body(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "unexpected actix error");
        Error::internal(REDACTED_MESSAGE)
    }
}

/// Error handler for the JSON, path and query extractors.
pub(crate) fn extractor_error<E: std::fmt::Display>(
    err: E,
    req: &HttpRequest,
) -> actix_web::Error {
    debug!(path = %req.path(), error = %err, "rejected malformed request");
    Error::invalid_request(err.to_string()).into()
}
