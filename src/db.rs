use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{ConnectOptions, Row};
use std::path::Path;

use crate::queries::ddl;
use crate::DynError;

/// Open a fresh connection to the request log database
/// Creates the file (and its parent directory) if missing and enables WAL mode
pub async fn open_connection(db_path: &Path) -> Result<SqliteConnection, DynError> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let conn = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .connect()
        .await?;
    Ok(conn)
}

/// Initialize database schema
/// Creates the request table and date index, then adds columns missing from older databases
pub async fn init_database_schema(conn: &mut SqliteConnection) -> Result<(), DynError> {
    sqlx::query(&ddl::create_requests_table())
        .execute(&mut *conn)
        .await?;

    if !has_column(conn, "enhanced_filename").await? {
        info!("Migrating enhancement_requests: adding enhanced_filename column");
        sqlx::query(&ddl::add_enhanced_filename_column())
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query(&ddl::create_date_index())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Check whether enhancement_requests has the given column
pub async fn has_column(conn: &mut SqliteConnection, column: &str) -> Result<bool, DynError> {
    let rows = sqlx::query(ddl::table_info())
        .fetch_all(&mut *conn)
        .await?;
    for row in rows {
        let name: String = row.try_get("name")?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Create a file-based connection in a temporary directory for testing
/// Returns (connection, guard) - keep the guard alive while the database is in use
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqliteConnection, tempfile::TempDir), DynError> {
    let guard = tempfile::tempdir()?;
    let conn = open_connection(&guard.path().join("test.db")).await?;
    Ok((conn, guard))
}
