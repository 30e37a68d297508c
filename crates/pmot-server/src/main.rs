mod config;

use std::sync::Arc;

use tracing::info;

use pmot_api::auth::TokenKeys;
use pmot_api::ledger::PremiumPlan;
use pmot_api::{AppState, AppStateInner, build_app};
use pmot_payments::razorpay::RazorpayGateway;

use crate::config::Config;

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "pmot=debug,pmot_api=debug,pmot_db=debug,pmot_payments=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = pmot_db::Database::open(&config.db_path)?;

    let gateway = RazorpayGateway::with_api_base(
        config.razorpay_api_base.clone(),
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
    );

    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenKeys::new(
            &config.jwt_secret,
            chrono::Duration::minutes(config.token_ttl_minutes),
        ),
        gateway: Arc::new(gateway),
        premium: PremiumPlan {
            amount: config.premium_amount,
            currency: config.premium_currency.clone(),
        },
        upload_dir: config.upload_dir.clone(),
    });

    let app = build_app(state);

    info!("PMOT server listening on {}", config.addr);
    info!(
        "Premium plan: {} {} (minor units), tokens valid {} min",
        config.premium_amount, config.premium_currency, config.token_ttl_minutes
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
