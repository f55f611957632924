use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the service router. Non-POST methods on the webhook path are
/// answered with 405 by the router itself.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhooks/stripe", post(handlers::stripe_webhook))
        .route("/api/ios/verify", post(handlers::verify_ios))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
