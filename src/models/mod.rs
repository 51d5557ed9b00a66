pub mod inventory;

pub use inventory::{
    Currency, InventoryItem, NewItem, UnknownCurrency, UpsertOutcome, DEFAULT_REORDER_LEVEL,
};
