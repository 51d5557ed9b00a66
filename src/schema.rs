use sqlx::Row;

use crate::{database::Database, error::InventoryError};

pub const INVENTORY_TABLE: &str = "inventory";

/// Columns added on top of the base table, in the order they were introduced.
/// Older data files get them with these defaults; nothing is ever dropped.
const OPTIONAL_COLUMNS: &[(&str, &str, &str)] = &[
    ("uom", "TEXT", "'pcs'"),
    ("currency", "TEXT", "'USD'"),
    ("reorder_level", "REAL", "70.0"),
    ("reorder_triggered", "INTEGER", "0"),
];

/// Creates the inventory table if needed and brings it up to the current
/// column set. Safe to run on every start.
pub async fn ensure_schema(db: &Database) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory (
            item_id TEXT PRIMARY KEY,
            item_name TEXT NOT NULL,
            category TEXT,
            quantity REAL NOT NULL DEFAULT 0,
            price REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(db)
    .await?;

    for (name, sql_type, default) in OPTIONAL_COLUMNS {
        if ensure_column(db, INVENTORY_TABLE, name, sql_type, default).await? {
            log::info!("Added column {}.{} ({} DEFAULT {})", INVENTORY_TABLE, name, sql_type, default);
        }
    }

    Ok(())
}

/// Adds `column` to `table` unless it already exists. Returns whether the
/// column was added.
///
/// `sql_type` and `default` are spliced into DDL, so `default` must be a SQL
/// literal (`'pcs'`, `70.0`, `0`).
pub async fn ensure_column(
    db: &Database,
    table: &str,
    column: &str,
    sql_type: &str,
    default: &str,
) -> Result<bool, InventoryError> {
    check_identifier(table)?;
    check_identifier(column)?;
    check_identifier(sql_type)?;
    check_default_literal(default)?;

    let existing = column_names(db, table).await?;
    if existing.iter().any(|name| name.eq_ignore_ascii_case(column)) {
        return Ok(false);
    }

    let ddl = format!(
        "ALTER TABLE {} ADD COLUMN {} {} DEFAULT {}",
        table, column, sql_type, default
    );
    sqlx::query(&ddl).execute(db).await?;
    Ok(true)
}

pub async fn column_names(db: &Database, table: &str) -> Result<Vec<String>, InventoryError> {
    check_identifier(table)?;

    let rows = sqlx::query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(db)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(InventoryError::from))
        .collect()
}

fn check_identifier(ident: &str) -> Result<(), InventoryError> {
    let valid = !ident.is_empty()
        && !ident.starts_with(|c: char| c.is_ascii_digit())
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(InventoryError::InvalidIdentifier(ident.to_string()))
    }
}

/// Accepts a numeric literal or a single-quoted string without embedded quotes.
fn check_default_literal(literal: &str) -> Result<(), InventoryError> {
    let numeric = !literal.is_empty()
        && literal.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        && literal.parse::<f64>().is_ok();
    let quoted = literal.len() >= 2
        && literal.starts_with('\'')
        && literal.ends_with('\'')
        && !literal[1..literal.len() - 1].contains('\'');

    if numeric || quoted {
        Ok(())
    } else {
        Err(InventoryError::InvalidIdentifier(literal.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_database_pool;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = create_database_pool(&dir.path().join("inventory.db"), Duration::from_millis(500))
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn ensure_schema_creates_the_full_column_set() {
        let (db, _dir) = setup().await;

        ensure_schema(&db).await.unwrap();

        let columns = column_names(&db, INVENTORY_TABLE).await.unwrap();
        assert_eq!(
            columns,
            vec![
                "item_id",
                "item_name",
                "category",
                "quantity",
                "price",
                "uom",
                "currency",
                "reorder_level",
                "reorder_triggered",
            ]
        );
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let (db, _dir) = setup().await;

        ensure_schema(&db).await.unwrap();
        let before = column_names(&db, INVENTORY_TABLE).await.unwrap();
        ensure_schema(&db).await.unwrap();
        let after = column_names(&db, INVENTORY_TABLE).await.unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn ensure_column_twice_is_a_no_op() {
        let (db, _dir) = setup().await;
        ensure_schema(&db).await.unwrap();

        let first = ensure_column(&db, INVENTORY_TABLE, "supplier", "TEXT", "''")
            .await
            .unwrap();
        let columns = column_names(&db, INVENTORY_TABLE).await.unwrap();
        let second = ensure_column(&db, INVENTORY_TABLE, "supplier", "TEXT", "''")
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(column_names(&db, INVENTORY_TABLE).await.unwrap(), columns);
    }

    #[tokio::test]
    async fn legacy_table_is_upgraded_without_losing_rows() {
        let (db, _dir) = setup().await;
        sqlx::query(
            "CREATE TABLE inventory (item_id TEXT PRIMARY KEY, item_name TEXT NOT NULL, \
             category TEXT, quantity REAL NOT NULL DEFAULT 0, price REAL NOT NULL DEFAULT 0)",
        )
        .execute(&db)
        .await
        .unwrap();
        sqlx::query("INSERT INTO inventory VALUES ('B7', 'Bolt', 'Hardware', 12, 0.1)")
            .execute(&db)
            .await
            .unwrap();

        ensure_schema(&db).await.unwrap();

        let row = sqlx::query(
            "SELECT item_name, uom, currency, reorder_level, reorder_triggered FROM inventory WHERE item_id = 'B7'",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(row.get::<String, _>("item_name"), "Bolt");
        assert_eq!(row.get::<String, _>("uom"), "pcs");
        assert_eq!(row.get::<String, _>("currency"), "USD");
        assert_eq!(row.get::<f64, _>("reorder_level"), 70.0);
        assert!(!row.get::<bool, _>("reorder_triggered"));
    }

    #[tokio::test]
    async fn hostile_identifiers_are_rejected() {
        let (db, _dir) = setup().await;
        ensure_schema(&db).await.unwrap();

        let err = ensure_column(&db, INVENTORY_TABLE, "x; DROP TABLE inventory", "TEXT", "''")
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::InvalidIdentifier(_)));
    }

    #[tokio::test]
    async fn default_must_be_a_plain_literal() {
        let (db, _dir) = setup().await;
        ensure_schema(&db).await.unwrap();

        for default in ["0; DROP TABLE inventory", "'a'b'", "'open", "x'1'", ""] {
            let err = ensure_column(&db, INVENTORY_TABLE, "supplier", "TEXT", default)
                .await
                .unwrap_err();
            assert!(matches!(err, InventoryError::InvalidIdentifier(_)), "{default}");
        }
        assert!(!column_names(&db, INVENTORY_TABLE)
            .await
            .unwrap()
            .contains(&"supplier".to_string()));

        assert!(ensure_column(&db, INVENTORY_TABLE, "shelf", "INTEGER", "-1").await.unwrap());
        assert!(ensure_column(&db, INVENTORY_TABLE, "note", "TEXT", "'n/a'").await.unwrap());
    }
}
