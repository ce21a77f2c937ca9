//! Mapping of claim errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use claim_workflow::{ClaimError, ErrorKind};
use serde::Serialize;

/// Error body returned by every failing route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Redeem code from the path.
    pub code: String,
    /// Human readable message.
    pub error: String,
    /// Whether repeating the same request may succeed.
    pub retryable: bool,
}

/// A claim error bound to the code it concerns.
#[derive(Debug)]
pub struct ApiError {
    code: String,
    error: ClaimError,
}

impl ApiError {
    /// Wrap `error` for `code`.
    pub fn new(code: impl Into<String>, error: ClaimError) -> Self {
        Self {
            code: code.into(),
            error,
        }
    }

    /// HTTP status for the error.
    pub fn status(&self) -> StatusCode {
        status_for(&self.error)
    }

    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        outcome_for(&self.error)
    }
}

/// HTTP status for a claim error.
pub fn status_for(error: &ClaimError) -> StatusCode {
    match error.kind() {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Transient => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Outcome label recorded in `claim_requests_total`.
pub fn outcome_for(error: &ClaimError) -> &'static str {
    match error {
        ClaimError::WalletMismatch { .. } => "wallet_mismatch",
        ClaimError::ClaimInProgress(_) | ClaimError::LeaseLost(_) => "in_progress",
        _ => match error.kind() {
            ErrorKind::Input => "rejected",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "in_progress",
            ErrorKind::Transient => "failed",
            ErrorKind::Timeout => "timeout",
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            success: false,
            code: self.code,
            error: self.error.to_string(),
            retryable: self.error.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}
