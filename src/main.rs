use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salone::config::AppConfig;
use salone::db;
use salone::services::payments::stripe::StripeCheckoutProvider;
use salone::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let pool = db::init_pool(&config.database_url).await?;

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY is not set; checkout will fail");
    }
    let payments = StripeCheckoutProvider::new(
        config.stripe_secret_key.clone(),
        config.currency.clone(),
    );

    let state = Arc::new(AppState {
        pool,
        config: config.clone(),
        payments: Box::new(payments),
    });

    let app = salone::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
