use std::sync::Arc;

use sqlx::FromRow;
use tokio::sync::Mutex;

use crate::{
    database::Database,
    error::InventoryError,
    models::{InventoryItem, NewItem, UpsertOutcome},
};

// Non-numeric cells (possible in legacy files, SQLite doesn't enforce REAL)
// come back as NULL instead of failing the decode of the whole snapshot.
const SELECT_ITEMS: &str = r#"
    SELECT
        item_id,
        item_name,
        COALESCE(category, '') AS category,
        CASE WHEN typeof(quantity) IN ('integer', 'real') THEN CAST(quantity AS REAL) END AS quantity,
        COALESCE(uom, 'pcs') AS uom,
        CASE WHEN typeof(price) IN ('integer', 'real') THEN CAST(price AS REAL) END AS price,
        COALESCE(currency, 'USD') AS currency,
        CASE WHEN typeof(reorder_level) IN ('integer', 'real') THEN CAST(reorder_level AS REAL) END AS reorder_level,
        COALESCE(reorder_triggered, 0) != 0 AS reorder_triggered
    FROM inventory
"#;

#[derive(FromRow)]
struct InventoryRow {
    item_id: String,
    item_name: String,
    category: String,
    quantity: Option<f64>,
    uom: String,
    price: Option<f64>,
    currency: String,
    reorder_level: Option<f64>,
    reorder_triggered: bool,
}

impl From<InventoryRow> for InventoryItem {
    fn from(row: InventoryRow) -> Self {
        Self {
            item_id: row.item_id,
            item_name: row.item_name,
            category: row.category,
            quantity: row.quantity.unwrap_or(f64::NAN),
            uom: row.uom,
            price: row.price.unwrap_or(f64::NAN),
            currency: row.currency,
            reorder_level: row.reorder_level.unwrap_or(f64::NAN),
            reorder_triggered: row.reorder_triggered,
        }
    }
}

/// Owns the connection pool and the lock that serializes every write.
///
/// Clones share both, so the repository can be handed to each request as
/// axum state.
#[derive(Clone)]
pub struct Repository {
    db: Database,
    write_lock: Arc<Mutex<()>>,
}

impl Repository {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn ping(&self) -> Result<(), InventoryError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    /// Full snapshot in storage order.
    pub async fn list_all(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        let rows = sqlx::query_as::<_, InventoryRow>(SELECT_ITEMS)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    pub async fn get(&self, item_id: &str) -> Result<Option<InventoryItem>, InventoryError> {
        let sql = format!("{} WHERE item_id = ?", SELECT_ITEMS);
        let row = sqlx::query_as::<_, InventoryRow>(&sql)
            .bind(item_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(InventoryItem::from))
    }

    /// Inserts a new item or overwrites every editable field of an existing
    /// one. Either way the reorder flag ends up cleared.
    pub async fn upsert(&self, item: NewItem) -> Result<UpsertOutcome, InventoryError> {
        let item = validate(item)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let existed = sqlx::query_scalar::<_, i64>("SELECT 1 FROM inventory WHERE item_id = ?")
            .bind(&item.item_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        sqlx::query(
            r#"
            INSERT INTO inventory (
                item_id, item_name, category, quantity, uom, price, currency,
                reorder_level, reorder_triggered
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(item_id) DO UPDATE SET
                item_name = excluded.item_name,
                category = excluded.category,
                quantity = excluded.quantity,
                uom = excluded.uom,
                price = excluded.price,
                currency = excluded.currency,
                reorder_level = excluded.reorder_level,
                reorder_triggered = 0
            "#,
        )
        .bind(&item.item_id)
        .bind(&item.item_name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(&item.uom)
        .bind(item.price)
        .bind(item.currency.code())
        .bind(item.reorder_level)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let outcome = if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        log::info!("Saved item {} ({:?})", item.item_id, outcome);
        Ok(outcome)
    }

    /// Applies a relative change and returns the new quantity, or `None` if
    /// no item has that id. A stored quantity that is not a number is left
    /// untouched and reported as a validation error.
    pub async fn adjust_quantity(
        &self,
        item_id: &str,
        delta: f64,
    ) -> Result<Option<f64>, InventoryError> {
        if !delta.is_finite() {
            return Err(InventoryError::validation("Quantity change must be a number"));
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let quantity = sqlx::query_scalar::<_, f64>(
            "UPDATE inventory SET quantity = quantity + ? \
             WHERE item_id = ? AND typeof(quantity) IN ('integer', 'real') \
             RETURNING CAST(quantity AS REAL)",
        )
        .bind(delta)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(quantity) = quantity else {
            let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM inventory WHERE item_id = ?")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            tx.rollback().await?;

            if exists {
                log::warn!("Refusing to adjust {}: stored quantity is not a number", item_id);
                return Err(InventoryError::validation(format!(
                    "Quantity of '{}' is unreadable",
                    item_id
                )));
            }
            log::warn!("Stock adjustment for unknown item {}", item_id);
            return Ok(None);
        };

        tx.commit().await?;

        log::info!("Adjusted {} by {} to {}", item_id, delta, quantity);
        Ok(Some(quantity))
    }

    /// Returns the number of rows removed (0 when the id is unknown).
    pub async fn delete(&self, item_id: &str) -> Result<u64, InventoryError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let affected = sqlx::query("DELETE FROM inventory WHERE item_id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        log::info!("Delete {}: {} row(s) affected", item_id, affected);
        Ok(affected)
    }

    /// Flags a reorder as placed. Quantity and threshold are untouched.
    pub async fn mark_ordered(&self, item_id: &str) -> Result<u64, InventoryError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let affected = sqlx::query("UPDATE inventory SET reorder_triggered = 1 WHERE item_id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        log::info!("Mark ordered {}: {} row(s) affected", item_id, affected);
        Ok(affected)
    }
}

fn validate(item: NewItem) -> Result<NewItem, InventoryError> {
    let item = NewItem {
        item_id: item.item_id.trim().to_string(),
        item_name: item.item_name.trim().to_string(),
        category: item.category.trim().to_string(),
        uom: item.uom.trim().to_string(),
        ..item
    };

    if item.item_id.is_empty() || item.item_name.is_empty() {
        return Err(InventoryError::validation("Item ID and Item Name are required!"));
    }
    if item.uom.is_empty() {
        return Err(InventoryError::validation("Unit of measure is required!"));
    }

    for (label, value) in [
        ("Quantity", item.quantity),
        ("Price", item.price),
        ("Reorder level", item.reorder_level),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(InventoryError::validation(format!(
                "{} must be a number of at least 0",
                label
            )));
        }
    }

    Ok(item)
}
