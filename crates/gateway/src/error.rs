use crate::response::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const UNSUPPORTED_FORMAT_DETAIL: &str = "Expected an image (JPEG, PNG, BMP, WEBP)";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unsupported format")]
    UnsupportedFormat { content_type: Option<String> },

    #[error("Missing file")]
    MissingFile(String),

    #[error("Payload too large")]
    PayloadTooLarge(String),

    #[error("Image decode failed")]
    ImageDecode(String),

    #[error("Inference failed")]
    Inference(String),

    #[error("Internal error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            ApiError::MissingFile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ImageDecode(_) | ApiError::Inference(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::UnsupportedFormat { .. } => UNSUPPORTED_FORMAT_DETAIL.to_string(),
            ApiError::MissingFile(detail)
            | ApiError::PayloadTooLarge(detail)
            | ApiError::ImageDecode(detail)
            | ApiError::Inference(detail)
            | ApiError::Internal(detail) => detail.clone(),
        }
    }

    /// Short label used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::UnsupportedFormat { .. } => "unsupported_format",
            ApiError::MissingFile(_) => "missing_file",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::ImageDecode(_) => "image_decode",
            ApiError::Inference(_) => "inference",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();

        match &self {
            ApiError::UnsupportedFormat { content_type } => {
                tracing::warn!(content_type = ?content_type, "Rejected non-image upload");
            }
            ApiError::MissingFile(_) | ApiError::PayloadTooLarge(_) | ApiError::ImageDecode(_) => {
                tracing::warn!(error = %self, detail = %detail, "Rejected upload");
            }
            ApiError::Inference(_) | ApiError::Internal(_) => {
                tracing::error!(error = %self, detail = %detail, "Detection request failed");
            }
        }

        let body = ErrorResponse {
            error: self.to_string(),
            detail: Some(detail),
        };

        (status, Json(body)).into_response()
    }
}
