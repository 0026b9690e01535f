//! Error responses: `{ "success": false, "message": ... }`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::EcommerceError;

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InsufficientStock { .. } | Self::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::PaymentGateway(_) | Self::Timeout | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Upstream and storage details stay in the logs.
        let message = match &self {
            Self::PaymentGateway(e) => {
                tracing::error!(error = %e, "Payment gateway failure");
                "Payment gateway unavailable, please retry".to_string()
            }
            Self::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                "Internal server error".to_string()
            }
            Self::Timeout => {
                tracing::error!("Order transaction timed out");
                "Request timed out, please retry".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
