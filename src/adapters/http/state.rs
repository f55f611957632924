use std::sync::Arc;

use crate::application::handlers::billing::{ReconcileWebhookHandler, VerifyIosHandler};

/// Shared handler state injected into every route.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<ReconcileWebhookHandler>,
    pub ios_verifier: Arc<VerifyIosHandler>,
}
