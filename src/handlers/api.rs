use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    handlers::storage_failure,
    models::InventoryItem,
    report::{filter_by_text, low_stock, summarize, Summary},
    repository::Repository,
};

#[derive(Deserialize)]
pub struct ItemsQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
pub struct ItemsResponse {
    pub items: Vec<InventoryItem>,
    pub low_stock: Vec<String>,
    pub summary: Summary,
}

/// JSON snapshot of the (optionally filtered) inventory with its totals.
pub async fn list_items(
    State(repo): State<Repository>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ItemsResponse>, StatusCode> {
    let items = repo.list_all().await.map_err(storage_failure)?;
    let view = filter_by_text(&items, &query.q);

    let response = ItemsResponse {
        low_stock: low_stock(view.iter().copied())
            .into_iter()
            .map(|item| item.item_id.clone())
            .collect(),
        summary: summarize(view.iter().copied()),
        items: view.into_iter().cloned().collect(),
    };

    Ok(Json(response))
}
