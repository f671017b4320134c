use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Failure taxonomy shared by the engine, the data providers and the
/// feedback notifier. Every variant aborts the current request only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Sunshine data provider unavailable: {0}")]
    DataProviderUnavailable(String),

    #[error("Feedback delivery failed: {0}")]
    DeliveryFailure(String),
}

impl SizingError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SizingError::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        SizingError::DataProviderUnavailable(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            SizingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SizingError::LocationNotFound(_) => StatusCode::NOT_FOUND,
            SizingError::DataProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            SizingError::DeliveryFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            SizingError::InvalidInput(_) => "InvalidInput",
            SizingError::LocationNotFound(_) => "LocationNotFound",
            SizingError::DataProviderUnavailable(_) => "DataProviderUnavailable",
            SizingError::DeliveryFailure(_) => "DeliveryFailure",
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for SizingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            SizingError::DataProviderUnavailable(_) | SizingError::DeliveryFailure(_) => {
                tracing::warn!(error = %self, "request failed on an external collaborator");
            }
            SizingError::InvalidInput(_) | SizingError::LocationNotFound(_) => {
                tracing::debug!(error = %self, "client error");
            }
        }

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections (malformed JSON, unknown panel type,
/// negative counts...) answer with the same 400 body as any other
/// `InvalidInput`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(SizingError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for SizingError {
    fn from(rejection: JsonRejection) -> Self {
        SizingError::InvalidInput(rejection.body_text())
    }
}

impl From<reqwest::Error> for SizingError {
    fn from(error: reqwest::Error) -> Self {
        SizingError::DataProviderUnavailable(error.to_string())
    }
}
