//! View state derived from a repository snapshot. Nothing here is cached:
//! every page recomputes from the latest `list_all`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::InventoryItem;

/// Case-insensitive substring match on name or category. A blank term keeps
/// everything.
pub fn filter_by_text<'a>(items: &'a [InventoryItem], term: &str) -> Vec<&'a InventoryItem> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return items.iter().collect();
    }

    items
        .iter()
        .filter(|item| {
            item.item_name.to_lowercase().contains(&term)
                || item.category.to_lowercase().contains(&term)
        })
        .collect()
}

/// Items strictly below their reorder level.
pub fn low_stock<'a, I>(items: I) -> Vec<&'a InventoryItem>
where
    I: IntoIterator<Item = &'a InventoryItem>,
{
    items.into_iter().filter(|item| item.is_low_stock()).collect()
}

/// Low-stock items nobody has reordered yet.
pub fn pending_reorders<'a, I>(items: I) -> Vec<&'a InventoryItem>
where
    I: IntoIterator<Item = &'a InventoryItem>,
{
    low_stock(items)
        .into_iter()
        .filter(|item| !item.reorder_triggered)
        .collect()
}

pub fn format_money(amount: f64, currency: &str) -> String {
    if amount.is_finite() {
        format!("{} {:.2}", currency, amount)
    } else {
        "N/A".to_string()
    }
}

pub fn format_quantity(quantity: f64) -> String {
    if quantity.is_finite() {
        quantity.to_string()
    } else {
        "N/A".to_string()
    }
}

pub fn format_threshold(level: f64) -> String {
    if level.is_finite() {
        format!("{:.1}", level)
    } else {
        "N/A".to_string()
    }
}

/// The banner line for one low-stock item, e.g. `Widget (60 pcs, threshold 70.0)`.
pub fn low_stock_line(item: &InventoryItem) -> String {
    format!(
        "{} ({} {}, threshold {})",
        item.item_name,
        format_quantity(item.quantity),
        item.uom,
        format_threshold(item.reorder_level)
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    /// `None` when some quantity could not be read.
    pub total_quantity: Option<f64>,
    /// `None` when some quantity or price could not be read.
    pub total_value: Option<f64>,
    pub value_by_currency: BTreeMap<String, Option<f64>>,
}

impl Summary {
    /// The currency code when every item shares one, i.e. when
    /// `total_value` is a meaningful single figure.
    pub fn single_currency(&self) -> Option<&str> {
        if self.value_by_currency.len() == 1 {
            self.value_by_currency.keys().next().map(String::as_str)
        } else {
            None
        }
    }
}

/// Count, total quantity and total value (quantity × price) of a snapshot.
///
/// Works on the numeric fields only; formatted strings never feed back in.
pub fn summarize<'a, I>(items: I) -> Summary
where
    I: IntoIterator<Item = &'a InventoryItem>,
{
    let mut count = 0;
    let mut total_quantity = Some(0.0);
    let mut total_value = Some(0.0);
    let mut value_by_currency: BTreeMap<String, Option<f64>> = BTreeMap::new();

    for item in items {
        count += 1;

        total_quantity = add_finite(total_quantity, item.quantity);

        let value = item.quantity * item.price;
        total_value = add_finite(total_value, value);

        let entry = value_by_currency
            .entry(item.currency.clone())
            .or_insert(Some(0.0));
        *entry = add_finite(*entry, value);
    }

    Summary {
        count,
        total_quantity,
        total_value,
        value_by_currency,
    }
}

fn add_finite(total: Option<f64>, value: f64) -> Option<f64> {
    match total {
        Some(sum) if value.is_finite() => Some(sum + value),
        _ => None,
    }
}
