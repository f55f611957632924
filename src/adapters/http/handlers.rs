//! Axum handlers for the billing surface.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::dto::{ErrorBody, IosVerifyRequest, IosVerifyResponse, WebhookAck};
use super::state::AppState;
use crate::application::handlers::billing::VerifyIosCommand;
use crate::domain::billing::WebhookError;
use crate::domain::foundation::UserId;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/webhooks/stripe
///
/// The raw body bytes are verified before any parsing; the signature covers
/// the exact payload as delivered.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing stripe-signature header".to_string(),
        );
    };

    match state.reconciler.handle(&body, signature).await {
        Ok(outcome) => (StatusCode::OK, Json(WebhookAck::from(outcome))).into_response(),
        Err(err) => webhook_error_response(err),
    }
}

/// POST /api/ios/verify
pub async fn verify_ios(
    State(state): State<AppState>,
    Json(request): Json<IosVerifyRequest>,
) -> Response {
    if request.product_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "product_id is required".to_string(),
        );
    }

    let command = VerifyIosCommand {
        user_id: UserId::from_uuid(request.user_id),
        product_id: request.product_id,
        transaction_id: request.transaction_id,
        active_product_ids: request.active_product_ids,
    };

    match state.ios_verifier.handle(command).await {
        Ok(status) => (
            StatusCode::OK,
            Json(IosVerifyResponse {
                ok: true,
                status: status.as_str().to_string(),
            }),
        )
            .into_response(),
        Err(err) => webhook_error_response(err),
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

fn webhook_error_response(err: WebhookError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!(error = %err, "webhook processing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}
