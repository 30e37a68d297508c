pub mod auth;
pub mod authz;
mod convert;
pub mod error;
pub mod files;
pub mod ledger;
pub mod middleware;
pub mod premium;
pub mod stories;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use pmot_db::Database;
use pmot_payments::PaymentGateway;

use crate::auth::TokenKeys;
use crate::ledger::PremiumPlan;
use crate::middleware::require_auth;

pub use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenKeys,
    pub gateway: Arc<dyn PaymentGateway>,
    pub premium: PremiumPlan,
    pub upload_dir: PathBuf,
}

/// Run synchronous database work off the async runtime.
pub(crate) async fn blocking<F, T, E>(state: &AppState, f: F) -> Result<T, E>
where
    F: FnOnce(&AppStateInner) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<anyhow::Error> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(state.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            E::from(anyhow::Error::from(e))
        })?
}

/// The full HTTP surface. Shared by the binary and the black-box tests.
pub fn build_app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/token", post(auth::login))
        .route("/users/", post(auth::register))
        .route(
            "/upload/",
            post(files::upload_file).layer(DefaultBodyLimit::max(files::MAX_UPLOAD_BODY)),
        )
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(&state.upload_dir));

    let protected_routes = Router::new()
        .route("/users/me", get(auth::me))
        .route("/premium/order", post(premium::create_order))
        .route("/premium/verify", post(premium::verify_payment))
        .route(
            "/stories/",
            post(stories::create_story).get(stories::list_stories),
        )
        .route(
            "/stories/{story_id}",
            get(stories::get_story)
                .put(stories::update_story)
                .delete(stories::delete_story),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
