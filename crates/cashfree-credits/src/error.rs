//! Error types for the credits API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::gateway::GatewayError;

/// Application error type.
///
/// Ledger storage problems never show up here; the ledger degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{context}: {source}")]
    Gateway {
        /// What the handler was trying to do.
        context: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps a gateway failure with the message shown to the caller.
    pub fn gateway(context: &'static str, source: GatewayError) -> Self {
        AppError::Gateway { context, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": msg })),
            )
                .into_response(),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "Unauthorized" })),
            )
                .into_response(),
            AppError::Gateway { context, source } => {
                tracing::error!("{}: {}", context, source);
                let error = source.upstream_message().unwrap_or(context);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": error,
                        "details": source.details(),
                    })),
                )
                    .into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_response() {
        let response = AppError::BadRequest("amount is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "amount is required");
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_gateway_status_response_uses_upstream_message() {
        let source = GatewayError::Status {
            status: 401,
            body: json!({"message": "authentication Failed", "code": "request_failed"}),
        };
        let response = AppError::gateway("Failed to create order", source).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "authentication Failed");
        assert_eq!(body["details"]["status"], 401);
        assert_eq!(body["details"]["body"]["code"], "request_failed");
    }

    #[tokio::test]
    async fn test_gateway_not_configured_response() {
        let response =
            AppError::gateway("Failed to create order", GatewayError::NotConfigured).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to create order");
        assert!(body["details"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_internal_error_hides_message() {
        let response = AppError::Internal("secret detail".to_string()).into_response();
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }
}
