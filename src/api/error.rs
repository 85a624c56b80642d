use crate::error::BlogError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

/// Error returned by an HTTP handler, rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new<T: Into<String>>(status: StatusCode, message: T) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        let status = match &err {
            BlogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BlogError::PostNotFound { .. } => StatusCode::NOT_FOUND,
            BlogError::SequenceConflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if !err.is_client_error() {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::DeliveryError;
    use crate::types::{BlogId, ChannelId, Sequence};

    #[test]
    fn test_status_mapping() {
        let blog = BlogId::new("b").unwrap();
        let cases = [
            (BlogError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                BlogError::PostNotFound {
                    blog: blog.clone(),
                    sequence: Sequence(2),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                BlogError::SequenceConflict {
                    blog,
                    sequence: Sequence(2),
                },
                StatusCode::CONFLICT,
            ),
            (
                BlogError::Delivery {
                    channel: ChannelId::from("c"),
                    source: DeliveryError::Timeout,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (BlogError::Locked, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let client = err.is_client_error();
            let status = ApiError::from(err).status();
            assert_eq!(status, expected);
            assert_eq!(status.is_client_error(), client);
        }
    }
}
