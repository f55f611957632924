use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flashdeck_billing::adapters::http::{router, AppState};
use flashdeck_billing::adapters::postgres::{
    PostgresFingerprintLedger, PostgresSubscriptionStore, PostgresUserDirectory,
};
use flashdeck_billing::adapters::stripe::StripeAdapter;
use flashdeck_billing::application::handlers::billing::{
    ReconcileWebhookHandler, VerifyIosHandler,
};
use flashdeck_billing::config::AppConfig;
use flashdeck_billing::domain::billing::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(config.database.connection_url())
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let provider = Arc::new(StripeAdapter::new(
        reqwest::Client::new(),
        config.payment.stripe_secret_key.clone(),
    ));
    let subscriptions = Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let fingerprints = Arc::new(PostgresFingerprintLedger::new(pool.clone()));
    let users = Arc::new(PostgresUserDirectory::new(pool));

    let reconciler = Arc::new(ReconcileWebhookHandler::new(
        WebhookVerifier::new(config.payment.stripe_webhook_secret.clone()),
        provider,
        subscriptions.clone(),
        fingerprints,
        users.clone(),
    ));
    let ios_verifier = Arc::new(VerifyIosHandler::new(subscriptions, users));

    let app = router(AppState {
        reconciler,
        ios_verifier,
    });

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "billing service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
