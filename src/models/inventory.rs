use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_REORDER_LEVEL: f64 = 70.0;

/// One row of the `inventory` table.
///
/// Numeric fields that could not be read as numbers from a legacy data file
/// come back as NaN so one bad cell doesn't sink the whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,
    pub item_name: String,
    pub category: String,
    pub quantity: f64,
    pub uom: String,
    pub price: f64,
    pub currency: String,
    pub reorder_level: f64,
    pub reorder_triggered: bool,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity < self.reorder_level
    }

    pub fn has_unreadable_numbers(&self) -> bool {
        !(self.quantity.is_finite() && self.price.is_finite() && self.reorder_level.is_finite())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Gbp, Currency::Inr];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCurrency(pub String);

impl fmt::Display for UnknownCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported currency '{}'", self.0)
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| UnknownCurrency(code.to_string()))
    }
}

/// Everything the Add/Update form submits. `reorder_triggered` is absent on
/// purpose: saving an item always clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub item_id: String,
    pub item_name: String,
    pub category: String,
    pub quantity: f64,
    pub uom: String,
    pub price: f64,
    pub currency: Currency,
    pub reorder_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
