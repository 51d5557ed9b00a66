use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{handlers, repository::Repository};

pub fn create_router(repo: Repository) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::permanent("/inventory") }))
        .route("/healthz", get(handlers::healthz))

        // Overview
        .route("/inventory", get(handlers::inventory::overview))
        .route("/inventory/export.csv", get(handlers::inventory::export_csv))

        // Add / Update
        .route("/inventory/items/new", get(handlers::inventory::item_form))
        .route("/inventory/items", post(handlers::inventory::save_item))

        // Stock management
        .route("/inventory/stock", get(handlers::stock::stock_view))
        .route("/inventory/stock/:item_id/adjust", post(handlers::stock::adjust_stock))
        .route("/inventory/stock/:item_id/mark-ordered", post(handlers::stock::mark_ordered))
        .route("/inventory/stock/:item_id/delete", post(handlers::stock::delete_item))

        // API routes
        .route("/api/items", get(handlers::api::list_items))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new()),
        )
        .with_state(repo)
}
