use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::InventoryError,
    export::{to_delimited, Column},
    handlers::{render, storage_failure},
    middleware::{set_flash, take_flash, Flash},
    models::{Currency, InventoryItem, NewItem, UpsertOutcome, DEFAULT_REORDER_LEVEL},
    report::{
        filter_by_text, format_money, format_quantity, format_threshold, low_stock_line,
        pending_reorders, summarize, Summary,
    },
    repository::Repository,
};

#[derive(Template)]
#[template(path = "inventory/overview.html")]
struct OverviewTemplate {
    flash: Option<Flash>,
    search: String,
    columns_param: String,
    available_columns: String,
    headers: Vec<&'static str>,
    rows: Vec<OverviewRow>,
    total_rows: usize,
    low_stock_lines: Vec<String>,
    total_items: usize,
    total_quantity: String,
    value_metrics: Vec<Metric>,
    export_href: String,
}

#[derive(Template)]
#[template(path = "inventory/item_form.html")]
struct ItemFormTemplate {
    flash: Option<Flash>,
    form: ItemFormValues,
    currencies: Vec<CurrencyOption>,
    editing: bool,
}

struct OverviewRow {
    low_stock: bool,
    cells: Vec<String>,
}

struct Metric {
    label: String,
    value: String,
}

struct CurrencyOption {
    code: &'static str,
    selected: bool,
}

/// Form values as text, so a rejected submission can be shown back as typed.
#[derive(Default)]
struct ItemFormValues {
    item_id: String,
    item_name: String,
    category: String,
    quantity: String,
    uom: String,
    price: String,
    currency: String,
    reorder_level: String,
}

impl From<&InventoryItem> for ItemFormValues {
    fn from(item: &InventoryItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            item_name: item.item_name.clone(),
            category: item.category.clone(),
            quantity: format_quantity(item.quantity),
            uom: item.uom.clone(),
            price: format_quantity(item.price),
            currency: item.currency.clone(),
            reorder_level: format_quantity(item.reorder_level),
        }
    }
}

impl From<ItemForm> for ItemFormValues {
    fn from(form: ItemForm) -> Self {
        Self {
            item_id: form.item_id,
            item_name: form.item_name,
            category: form.category.unwrap_or_default(),
            quantity: form.quantity.unwrap_or_default(),
            uom: form.uom.unwrap_or_default(),
            price: form.price.unwrap_or_default(),
            currency: form.currency.unwrap_or_default(),
            reorder_level: form.reorder_level.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub struct OverviewQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    columns: String,
}

#[derive(Deserialize)]
pub struct ItemFormQuery {
    item_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ItemForm {
    #[serde(default)]
    item_id: String,
    #[serde(default)]
    item_name: String,
    category: Option<String>,
    quantity: Option<String>,
    uom: Option<String>,
    price: Option<String>,
    currency: Option<String>,
    reorder_level: Option<String>,
}

impl ItemForm {
    fn to_new_item(&self) -> Result<NewItem, InventoryError> {
        let currency = match self.currency.as_deref().map(str::trim) {
            None | Some("") => Currency::default(),
            Some(code) => code
                .parse::<Currency>()
                .map_err(|e| InventoryError::validation(e.to_string()))?,
        };

        Ok(NewItem {
            item_id: self.item_id.clone(),
            item_name: self.item_name.clone(),
            category: self.category.clone().unwrap_or_default(),
            quantity: parse_number("Quantity", self.quantity.as_deref(), 0.0)?,
            uom: self.uom.clone().unwrap_or_default(),
            price: parse_number("Price per Unit", self.price.as_deref(), 0.0)?,
            currency,
            reorder_level: parse_number(
                "Reorder level",
                self.reorder_level.as_deref(),
                DEFAULT_REORDER_LEVEL,
            )?,
        })
    }
}

/// Empty input falls back to `default`; anything else must parse.
pub(crate) fn parse_number(
    label: &str,
    raw: Option<&str>,
    default: f64,
) -> Result<f64, InventoryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| InventoryError::validation(format!("{} must be a number", label))),
    }
}

fn display_cell(column: Column, item: &InventoryItem) -> String {
    match column {
        Column::Quantity => format_quantity(item.quantity),
        Column::Price => format_money(item.price, &item.currency),
        Column::ReorderLevel => format_threshold(item.reorder_level),
        Column::ReorderTriggered => String::from(if item.reorder_triggered { "Yes" } else { "No" }),
        other => other.value(item),
    }
}

fn value_metrics(summary: &Summary) -> Vec<Metric> {
    if summary.value_by_currency.is_empty() {
        return vec![Metric {
            label: "Total Inventory Value".to_string(),
            value: format_money(0.0, Currency::default().code()),
        }];
    }

    if let Some(code) = summary.single_currency() {
        return vec![Metric {
            label: "Total Inventory Value".to_string(),
            value: summary
                .total_value
                .map(|v| format_money(v, code))
                .unwrap_or_else(|| "N/A".to_string()),
        }];
    }

    summary
        .value_by_currency
        .iter()
        .map(|(code, total)| Metric {
            label: format!("Total Inventory Value ({})", code),
            value: total
                .map(|v| format_money(v, code))
                .unwrap_or_else(|| "N/A".to_string()),
        })
        .collect()
}

fn overview_query_string(search: &str, columns: &str) -> String {
    format!(
        "q={}&columns={}",
        urlencoding::encode(search),
        urlencoding::encode(columns)
    )
}

// Overview: list, search, low-stock banner, summary metrics and export
pub async fn overview(
    State(repo): State<Repository>,
    cookies: Cookies,
    Query(query): Query<OverviewQuery>,
) -> Result<Html<String>, StatusCode> {
    let mut flash = take_flash(&cookies);

    let columns = match Column::parse_list(&query.columns) {
        Ok(columns) => columns,
        Err(err) => {
            flash = Some(Flash::warning(err.to_string()));
            Column::ALL.to_vec()
        }
    };

    let items = repo.list_all().await.map_err(storage_failure)?;

    // Metrics and the low-stock banner cover the whole inventory; the table
    // and the export follow the search box.
    let summary = summarize(&items);
    let low_stock_lines = pending_reorders(&items)
        .into_iter()
        .map(low_stock_line)
        .collect();

    let rows = filter_by_text(&items, &query.q)
        .into_iter()
        .map(|item| OverviewRow {
            low_stock: item.is_low_stock(),
            cells: columns.iter().map(|c| display_cell(*c, item)).collect(),
        })
        .collect();

    let columns_param = columns
        .iter()
        .map(|c| c.key())
        .collect::<Vec<_>>()
        .join(",");

    let template = OverviewTemplate {
        flash,
        export_href: format!(
            "/inventory/export.csv?{}",
            overview_query_string(&query.q, &columns_param)
        ),
        search: query.q,
        available_columns: Column::ALL
            .iter()
            .map(|c| c.key())
            .collect::<Vec<_>>()
            .join(", "),
        headers: columns.iter().map(|c| c.header()).collect(),
        rows,
        total_rows: items.len(),
        low_stock_lines,
        total_items: summary.count,
        total_quantity: summary
            .total_quantity
            .map(format_quantity)
            .unwrap_or_else(|| "N/A".to_string()),
        value_metrics: value_metrics(&summary),
        columns_param,
    };

    render(&template)
}

// CSV download of the rows and columns currently shown on the overview
pub async fn export_csv(
    State(repo): State<Repository>,
    Query(query): Query<OverviewQuery>,
) -> Result<Response, StatusCode> {
    let columns = Column::parse_list(&query.columns).map_err(|e| {
        log::warn!("Rejected export request: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let items = repo.list_all().await.map_err(storage_failure)?;
    let view = filter_by_text(&items, &query.q);
    let body = to_delimited(view, &columns).map_err(storage_failure)?;

    let filename = format!(
        "inventory_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

fn currency_options(selected: &str) -> Vec<CurrencyOption> {
    Currency::ALL
        .into_iter()
        .map(|c| CurrencyOption {
            code: c.code(),
            selected: c.code().eq_ignore_ascii_case(selected),
        })
        .collect()
}

// Add / Update form, prefilled when the item already exists
pub async fn item_form(
    State(repo): State<Repository>,
    cookies: Cookies,
    Query(query): Query<ItemFormQuery>,
) -> Result<Html<String>, StatusCode> {
    let flash = take_flash(&cookies);

    let existing = match query.item_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => repo.get(id).await.map_err(storage_failure)?,
        _ => None,
    };

    let form = match &existing {
        Some(item) => ItemFormValues::from(item),
        None => ItemFormValues {
            item_id: query.item_id.unwrap_or_default(),
            quantity: "0".to_string(),
            uom: "pcs".to_string(),
            price: "0".to_string(),
            currency: Currency::default().code().to_string(),
            reorder_level: format_quantity(DEFAULT_REORDER_LEVEL),
            ..ItemFormValues::default()
        },
    };

    let template = ItemFormTemplate {
        flash,
        currencies: currency_options(&form.currency),
        form,
        editing: existing.is_some(),
    };
    render(&template)
}

// Upsert. Validation problems re-render the form with the submitted values.
pub async fn save_item(
    State(repo): State<Repository>,
    cookies: Cookies,
    Form(form): Form<ItemForm>,
) -> Result<Response, StatusCode> {
    let result = match form.to_new_item() {
        Ok(item) => repo.upsert(item).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(outcome) => {
            let verb = match outcome {
                UpsertOutcome::Inserted => "added",
                UpsertOutcome::Updated => "updated",
            };
            set_flash(
                &cookies,
                Flash::success(format!(
                    "✅ Item '{}' {} successfully!",
                    form.item_name.trim(),
                    verb
                )),
            );
            Ok(Redirect::to("/inventory").into_response())
        }
        Err(InventoryError::Validation(message)) => {
            let item_id = form.item_id.trim();
            let editing = !item_id.is_empty()
                && repo.get(item_id).await.map_err(storage_failure)?.is_some();

            let values = ItemFormValues::from(form);
            let template = ItemFormTemplate {
                flash: Some(Flash::warning(format!("⚠️ {}", message))),
                currencies: currency_options(&values.currency),
                form: values,
                editing,
            };
            let page = render(&template)?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(storage_failure(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(quantity: &str, currency: &str) -> ItemForm {
        ItemForm {
            item_id: "A1".into(),
            item_name: "Widget".into(),
            category: None,
            quantity: Some(quantity.into()),
            uom: Some("pcs".into()),
            price: Some("2.50".into()),
            currency: Some(currency.into()),
            reorder_level: Some(String::new()),
        }
    }

    #[test]
    fn form_fields_are_parsed_with_defaults() {
        let item = form("100", "eur").to_new_item().unwrap();
        assert_eq!(item.quantity, 100.0);
        assert_eq!(item.price, 2.5);
        assert_eq!(item.currency, Currency::Eur);
        assert_eq!(item.reorder_level, DEFAULT_REORDER_LEVEL);
        assert_eq!(item.category, "");
    }

    #[test]
    fn non_numeric_quantity_is_a_validation_error() {
        let err = form("lots", "USD").to_new_item().unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be a number");
    }

    #[test]
    fn unsupported_currency_is_a_validation_error() {
        let err = form("1", "JPY").to_new_item().unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn price_cell_is_formatted_with_currency() {
        let item = InventoryItem {
            item_id: "A1".into(),
            item_name: "Widget".into(),
            category: "Hardware".into(),
            quantity: 60.0,
            uom: "pcs".into(),
            price: 2.5,
            currency: "GBP".into(),
            reorder_level: 70.0,
            reorder_triggered: true,
        };
        assert_eq!(display_cell(Column::Price, &item), "GBP 2.50");
        assert_eq!(display_cell(Column::ReorderLevel, &item), "70.0");
        assert_eq!(display_cell(Column::ReorderTriggered, &item), "Yes");
        assert_eq!(display_cell(Column::ItemName, &item), "Widget");
    }

    fn item(item_id: &str, quantity: f64, price: f64, currency: &str) -> InventoryItem {
        InventoryItem {
            item_id: item_id.into(),
            item_name: item_id.into(),
            category: String::new(),
            quantity,
            uom: "pcs".into(),
            price,
            currency: currency.into(),
            reorder_level: 70.0,
            reorder_triggered: false,
        }
    }

    #[test]
    fn one_currency_gets_a_single_value_metric() {
        let items = vec![item("A1", 100.0, 2.5, "USD"), item("B2", 4.0, 1.0, "USD")];
        let metrics = value_metrics(&summarize(&items));

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].label, "Total Inventory Value");
        assert_eq!(metrics[0].value, "USD 254.00");
    }

    #[test]
    fn mixed_currencies_get_one_metric_each() {
        let items = vec![item("A1", 100.0, 2.5, "USD"), item("B2", 4.0, f64::NAN, "EUR")];
        let metrics = value_metrics(&summarize(&items));

        let labels: Vec<&str> = metrics.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Total Inventory Value (EUR)", "Total Inventory Value (USD)"]);
        assert_eq!(metrics[0].value, "N/A");
        assert_eq!(metrics[1].value, "USD 250.00");
    }
}
