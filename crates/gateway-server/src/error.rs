//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{ConfigurationErrorKind, GatewayError};
use serde::Serialize;
use tracing::{error, warn};

/// Error returned by every handler
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Human-readable message
    pub message: String,
    /// Error category
    pub error_type: &'static str,
    /// Machine-readable code
    pub code: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    error_type: &'a str,
    code: &'a str,
}

impl ApiError {
    /// Build an error from parts
    pub fn new(
        status: StatusCode,
        error_type: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            error_type,
            code: code.into(),
        }
    }

    /// 400 for malformed input
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "bad_request",
            message,
        )
    }

    /// 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found_error", "not_found", message)
    }

    /// 500
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal",
            message,
        )
    }
}

fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
        GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
        GatewayError::Configuration {
            kind: ConfigurationErrorKind::ProviderNotFound,
            ..
        } => StatusCode::NOT_FOUND,
        GatewayError::Configuration { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::Conflict { .. } => StatusCode::CONFLICT,
        GatewayError::Template { .. }
        | GatewayError::Decode { .. }
        | GatewayError::Transport { .. } => StatusCode::BAD_GATEWAY,
        GatewayError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        GatewayError::Multiple { errors } => errors
            .first()
            .map_or(StatusCode::BAD_REQUEST, status_for),
        GatewayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn code_for(err: &GatewayError) -> String {
    match err {
        GatewayError::Configuration { kind, .. } => kind.code().to_string(),
        GatewayError::Template { stage, .. } => format!("{stage}_template"),
        GatewayError::Decode { stage, .. } => format!("{}_decode", stage.to_string().replace(' ', "_")),
        GatewayError::Transport {
            status: Some(status),
            ..
        } => format!("upstream_{status}"),
        other => other.label().to_string(),
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = status_for(&err);
        let error_type = match status {
            StatusCode::BAD_REQUEST => "invalid_request_error",
            StatusCode::NOT_FOUND => "not_found_error",
            StatusCode::CONFLICT => "conflict_error",
            StatusCode::UNPROCESSABLE_ENTITY => "configuration_error",
            StatusCode::BAD_GATEWAY => "upstream_error",
            StatusCode::REQUEST_TIMEOUT => "cancelled",
            _ => "internal_error",
        };

        // Upstream bodies help diagnose template mismatches.
        let message = match &err {
            GatewayError::Transport {
                body: Some(body), ..
            } => format!("{err}: {body}"),
            _ => err.to_string(),
        };

        Self {
            status,
            message,
            error_type,
            code: code_for(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, code = %self.code, error = %self.message, "Request failed");
        } else {
            warn!(status = %self.status, code = %self.code, error = %self.message, "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                message: &self.message,
                error_type: self.error_type,
                code: &self.code,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
