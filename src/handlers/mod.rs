pub mod api;
pub mod inventory;
pub mod stock;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use askama::Template;

use crate::{error::InventoryError, repository::Repository};

pub(crate) fn render<T: Template>(template: &T) -> Result<Html<String>, StatusCode> {
    template.render().map(Html).map_err(|e| {
        log::error!("Failed to render template: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Logs a repository failure and picks the status for it: 503 when the data
/// file can't be reached, 500 otherwise.
pub(crate) fn storage_failure(err: InventoryError) -> StatusCode {
    if err.is_unavailable() {
        log::error!("Inventory storage unavailable: {}", err);
    } else {
        log::error!("Inventory operation failed: {}", err);
    }
    err.status_code()
}

pub async fn healthz(State(repo): State<Repository>) -> impl IntoResponse {
    match repo.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            log::warn!("Health check failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
        }
    }
}
