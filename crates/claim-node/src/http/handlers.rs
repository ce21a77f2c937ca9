//! Route handlers.

use super::error::ApiError;
use super::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use claim_telemetry::{
    encode_metrics, log_claim_event, time_histogram, CLAIMS_TOTAL, CLAIM_DURATION,
    HTTP_DURATION, HTTP_RESPONSES,
};

fn record_http(route: &str, status: StatusCode) {
    HTTP_RESPONSES
        .with_label_values(&[route, status.as_str()])
        .inc();
}

/// `GET|POST /mint/:id/:wallet`
pub async fn mint(
    State(state): State<AppState>,
    Path((code, wallet)): Path<(String, String)>,
) -> Response {
    let _timer = time_histogram!(CLAIM_DURATION);
    let _http_timer = HTTP_DURATION.with_label_values(&["mint"]).start_timer();

    let (status, response) = match state.api.claim(&code, &wallet).await {
        Ok(receipt) => {
            let outcome = if receipt.already_claimed {
                "replayed"
            } else {
                "minted"
            };
            CLAIMS_TOTAL.with_label_values(&[outcome]).inc();
            log_claim_event!(
                info,
                "http",
                "[claim] claim served",
                code,
                outcome = outcome,
                token_ref = %receipt.token_ref,
                tx_ref = %receipt.tx_ref
            );
            (StatusCode::OK, Json(receipt).into_response())
        }
        Err(error) => {
            let error = ApiError::new(code.clone(), error);
            CLAIMS_TOTAL.with_label_values(&[error.outcome()]).inc();
            let status = error.status();
            if status.is_server_error() {
                log_claim_event!(warn, "http", "[claim] claim failed", code, status = status.as_u16(), error = ?error);
            } else {
                log_claim_event!(debug, "http", "[claim] claim refused", code, status = status.as_u16());
            }
            (status, error.into_response())
        }
    };

    record_http("mint", status);
    response
}

/// `GET /check/:id`
pub async fn check(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    let _http_timer = HTTP_DURATION.with_label_values(&["check"]).start_timer();

    let (status, response) = match state.api.check(&code).await {
        Ok(view) => (StatusCode::OK, Json(view).into_response()),
        Err(error) => {
            let error = ApiError::new(code, error);
            (error.status(), error.into_response())
        }
    };

    record_http("check", status);
    response
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "claim-node",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /metrics`
pub async fn metrics() -> Response {
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
