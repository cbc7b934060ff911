//! Panel HTTP server: router assembly and startup

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::storage::db::DbPool;

use super::{api, pages};

/// Shared state for the panel server.
#[derive(Clone)]
pub struct PanelState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
}

/// Build the panel router. Separated from [`run_panel_server`] so tests can
/// drive the same routes without a listener.
pub fn create_panel_router(state: PanelState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/cities", get(pages::cities))
        .route("/order-tips", get(pages::order_tips))
        .route("/assign-order", get(pages::assign_order))
        .route("/statements", get(pages::statements))
        .route("/users-database", get(pages::users_database))
        .route("/expenses", get(pages::expenses))
        .route("/registration-requests", get(pages::registration_requests))
        .route("/api/registration-requests/{id}/approve", post(api::approve_request))
        .route("/api/registration-requests/{id}/reject", post(api::reject_request))
        .route("/api/cities", get(api::list_cities))
        .route("/api/cities/{id}/products", get(api::list_city_products))
        .route("/api/cities/{id}/couriers", get(api::list_city_couriers))
        .route("/api/products", post(api::create_product))
        .route("/api/products/{id}", put(api::update_product).delete(api::delete_product))
        .route("/api/orders", post(api::create_order).get(api::list_orders))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// GET /health — simple health check, the one route without a token.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Start the panel server.
pub async fn run_panel_server(config: Arc<AppConfig>, db: Arc<DbPool>) -> anyhow::Result<()> {
    let addr = config.panel_addr();
    let state = PanelState { db, config };
    let app = create_panel_router(state);

    log::info!("Starting admin panel on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
