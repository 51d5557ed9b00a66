use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::InventoryError,
    handlers::{inventory::parse_number, render, storage_failure},
    middleware::{set_flash, take_flash, Flash},
    models::InventoryItem,
    report::{format_money, format_quantity, format_threshold},
    repository::Repository,
};

#[derive(Template)]
#[template(path = "inventory/stock.html")]
struct StockTemplate {
    flash: Option<Flash>,
    item_ids: Vec<ItemChoice>,
    selected: Option<StockDetail>,
}

struct ItemChoice {
    item_id: String,
    label: String,
    selected: bool,
}

struct StockDetail {
    item_id: String,
    item_id_url: String,
    item_name: String,
    category: String,
    quantity: String,
    uom: String,
    price: String,
    reorder_level: String,
    reorder_triggered: bool,
    low_stock: bool,
}

impl From<&InventoryItem> for StockDetail {
    fn from(item: &InventoryItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            item_id_url: urlencoding::encode(&item.item_id).into_owned(),
            item_name: item.item_name.clone(),
            category: item.category.clone(),
            quantity: format_quantity(item.quantity),
            uom: item.uom.clone(),
            price: format_money(item.price, &item.currency),
            reorder_level: format_threshold(item.reorder_level),
            reorder_triggered: item.reorder_triggered,
            low_stock: item.is_low_stock(),
        }
    }
}

#[derive(Deserialize)]
pub struct StockQuery {
    item_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AdjustForm {
    delta: Option<String>,
}

fn stock_page(item_id: &str) -> Redirect {
    Redirect::to(&format!(
        "/inventory/stock?item_id={}",
        urlencoding::encode(item_id)
    ))
}

fn not_found(cookies: &Cookies, item_id: &str) -> Redirect {
    set_flash(
        cookies,
        Flash::warning(format!("⚠️ Item ID '{}' not found, nothing changed", item_id)),
    );
    Redirect::to("/inventory/stock")
}

// Stock management: per-item detail with adjust, mark-ordered and delete actions
pub async fn stock_view(
    State(repo): State<Repository>,
    cookies: Cookies,
    Query(query): Query<StockQuery>,
) -> Result<Html<String>, StatusCode> {
    let mut flash = take_flash(&cookies);
    let items = repo.list_all().await.map_err(storage_failure)?;

    let wanted = query.item_id.as_deref().filter(|id| !id.is_empty());
    let selected = match wanted {
        Some(id) => {
            let found = items.iter().find(|item| item.item_id == id);
            if found.is_none() && flash.is_none() {
                flash = Some(Flash::warning(format!("⚠️ Item ID '{}' not found", id)));
            }
            found
        }
        None => items.first(),
    };

    let item_ids = items
        .iter()
        .map(|item| ItemChoice {
            item_id: item.item_id.clone(),
            label: format!("{} - {}", item.item_id, item.item_name),
            selected: selected.map_or(false, |s| s.item_id == item.item_id),
        })
        .collect();

    let template = StockTemplate {
        flash,
        item_ids,
        selected: selected.map(StockDetail::from),
    };
    render(&template)
}

pub async fn adjust_stock(
    State(repo): State<Repository>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    Form(form): Form<AdjustForm>,
) -> Result<Redirect, StatusCode> {
    let delta = match parse_number("Quantity change", form.delta.as_deref(), 0.0) {
        Ok(delta) => delta,
        Err(err) => {
            set_flash(&cookies, Flash::warning(format!("⚠️ {}", err)));
            return Ok(stock_page(&item_id));
        }
    };

    match repo.adjust_quantity(&item_id, delta).await {
        Ok(Some(quantity)) => {
            set_flash(
                &cookies,
                Flash::success(format!(
                    "✅ Stock updated. New quantity: {}",
                    format_quantity(quantity)
                )),
            );
            Ok(stock_page(&item_id))
        }
        Ok(None) => Ok(not_found(&cookies, &item_id)),
        Err(InventoryError::Validation(message)) => {
            set_flash(&cookies, Flash::warning(format!("⚠️ {}", message)));
            Ok(stock_page(&item_id))
        }
        Err(err) => Err(storage_failure(err)),
    }
}

pub async fn mark_ordered(
    State(repo): State<Repository>,
    cookies: Cookies,
    Path(item_id): Path<String>,
) -> Result<Redirect, StatusCode> {
    let affected = repo.mark_ordered(&item_id).await.map_err(storage_failure)?;

    if affected == 0 {
        return Ok(not_found(&cookies, &item_id));
    }

    set_flash(
        &cookies,
        Flash::success(format!("🛒 Reorder for '{}' marked as placed", item_id)),
    );
    Ok(stock_page(&item_id))
}

pub async fn delete_item(
    State(repo): State<Repository>,
    cookies: Cookies,
    Path(item_id): Path<String>,
) -> Result<Redirect, StatusCode> {
    let affected = repo.delete(&item_id).await.map_err(storage_failure)?;

    if affected == 0 {
        return Ok(not_found(&cookies, &item_id));
    }

    set_flash(
        &cookies,
        Flash::success(format!("🗑️ Item ID '{}' deleted successfully!", item_id)),
    );
    Ok(Redirect::to("/inventory/stock"))
}
