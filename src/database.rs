use std::io;
use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error::InventoryError;

pub type Database = Pool<Sqlite>;

/// Opens the shared data file, creating it if absent.
///
/// The parent directory is never created: when a network share is not
/// mounted we want a loud failure, not a fresh empty file on local disk.
/// The rollback journal is used instead of WAL, which is unsafe on network
/// filesystems.
pub async fn create_database_pool(
    path: &Path,
    busy_timeout: Duration,
) -> Result<Database, InventoryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(InventoryError::StorageUnavailable(sqlx::Error::Io(
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory {} is not reachable", parent.display()),
                ),
            )));
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .acquire_timeout(busy_timeout + Duration::from_secs(1))
        .connect_with(options)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    log::info!("Connected to inventory data file {}", path.display());
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_the_file_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");

        let pool = create_database_pool(&path, Duration::from_millis(500))
            .await
            .unwrap();

        assert!(path.exists());
        pool.close().await;
    }

    #[tokio::test]
    async fn unreachable_directory_is_reported_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-mounted").join("inventory.db");

        let err = create_database_pool(&path, Duration::from_millis(500))
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
        assert!(!path.exists());
    }
}
