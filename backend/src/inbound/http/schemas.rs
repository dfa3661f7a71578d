//! Response envelopes shared by every endpoint.
//!
//! Successful responses wrap their payload as `{"data": ...}`; failures are
//! rendered as `{"error": "<message>"}`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;

/// Success envelope.
///
/// # Examples
/// ```
/// use murmur::inbound::http::schemas::Data;
///
/// let body = serde_json::to_value(Data::new(7)).unwrap();
/// assert_eq!(body, serde_json::json!({"data": 7}));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message. Internal failures are reported generically.
    #[schema(example = "post not found")]
    pub error: String,
}

impl From<&Error> for ErrorBody {
    fn from(error: &Error) -> Self {
        Self {
            error: error.message().to_owned(),
        }
    }
}
