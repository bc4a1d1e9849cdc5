use sea_query::{ColumnDef, Expr, Index, SqliteQueryBuilder, Table};

use crate::schema::EnhancementRequests;

/// CREATE TABLE IF NOT EXISTS enhancement_requests (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     date TEXT NOT NULL,
///     timestamp TEXT NOT NULL,
///     success BOOLEAN NOT NULL,
///     preset TEXT,
///     duration_seconds REAL,
///     processing_time REAL,
///     file_size_mb REAL,
///     error_message TEXT,
///     enhanced_filename TEXT,
///     created_at DATETIME DEFAULT CURRENT_TIMESTAMP
/// )
pub fn create_requests_table() -> String {
    Table::create()
        .table(EnhancementRequests::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(EnhancementRequests::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(EnhancementRequests::Date).string().not_null())
        .col(
            ColumnDef::new(EnhancementRequests::Timestamp)
                .string()
                .not_null(),
        )
        .col(
            ColumnDef::new(EnhancementRequests::Success)
                .boolean()
                .not_null(),
        )
        .col(ColumnDef::new(EnhancementRequests::Preset).string())
        .col(ColumnDef::new(EnhancementRequests::DurationSeconds).double())
        .col(ColumnDef::new(EnhancementRequests::ProcessingTime).double())
        .col(ColumnDef::new(EnhancementRequests::FileSizeMb).double())
        .col(ColumnDef::new(EnhancementRequests::ErrorMessage).string())
        .col(ColumnDef::new(EnhancementRequests::EnhancedFilename).string())
        .col(
            ColumnDef::new(EnhancementRequests::CreatedAt)
                .date_time()
                .default(Expr::current_timestamp()),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS enhancement_requests without the enhanced_filename column
///
/// Layout of databases written before output file names were recorded; kept for
/// migration tests.
pub fn create_requests_table_v1() -> String {
    Table::create()
        .table(EnhancementRequests::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(EnhancementRequests::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(EnhancementRequests::Date).string().not_null())
        .col(
            ColumnDef::new(EnhancementRequests::Timestamp)
                .string()
                .not_null(),
        )
        .col(
            ColumnDef::new(EnhancementRequests::Success)
                .boolean()
                .not_null(),
        )
        .col(ColumnDef::new(EnhancementRequests::Preset).string())
        .col(ColumnDef::new(EnhancementRequests::DurationSeconds).double())
        .col(ColumnDef::new(EnhancementRequests::ProcessingTime).double())
        .col(ColumnDef::new(EnhancementRequests::FileSizeMb).double())
        .col(ColumnDef::new(EnhancementRequests::ErrorMessage).string())
        .col(
            ColumnDef::new(EnhancementRequests::CreatedAt)
                .date_time()
                .default(Expr::current_timestamp()),
        )
        .to_string(SqliteQueryBuilder)
}

/// ALTER TABLE enhancement_requests ADD COLUMN enhanced_filename TEXT
pub fn add_enhanced_filename_column() -> String {
    Table::alter()
        .table(EnhancementRequests::Table)
        .add_column(ColumnDef::new(EnhancementRequests::EnhancedFilename).string())
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_date ON enhancement_requests(date)
pub fn create_date_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_date")
        .table(EnhancementRequests::Table)
        .col(EnhancementRequests::Date)
        .to_string(SqliteQueryBuilder)
}

/// PRAGMA table_info(enhancement_requests)
pub fn table_info() -> &'static str {
    "PRAGMA table_info(enhancement_requests)"
}
