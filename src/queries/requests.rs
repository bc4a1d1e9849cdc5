use sea_query::{Alias, Expr, Func, Order, Query, SqliteQueryBuilder};

use crate::schema::EnhancementRequests;
use crate::store::RequestLogEntry;

/// INSERT INTO enhancement_requests
///     (date, timestamp, success, preset, duration_seconds, processing_time,
///      file_size_mb, error_message, enhanced_filename)
/// VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
pub fn insert(entry: &RequestLogEntry) -> String {
    Query::insert()
        .into_table(EnhancementRequests::Table)
        .columns([
            EnhancementRequests::Date,
            EnhancementRequests::Timestamp,
            EnhancementRequests::Success,
            EnhancementRequests::Preset,
            EnhancementRequests::DurationSeconds,
            EnhancementRequests::ProcessingTime,
            EnhancementRequests::FileSizeMb,
            EnhancementRequests::ErrorMessage,
            EnhancementRequests::EnhancedFilename,
        ])
        .values_panic([
            entry.date_string().into(),
            entry.timestamp_string().into(),
            i32::from(entry.success).into(),
            entry.preset.clone().into(),
            entry.duration_seconds.into(),
            entry.processing_time.into(),
            entry.file_size_mb.into(),
            entry.error_message.clone().into(),
            entry.enhanced_filename.clone().into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT COUNT(id), SUM(success), SUM(duration_seconds), AVG(processing_time), SUM(file_size_mb)
/// FROM enhancement_requests WHERE date = ?
pub fn select_daily_totals(date: &str) -> String {
    Query::select()
        .expr(Func::count(Expr::col(EnhancementRequests::Id)))
        .expr(Func::sum(Expr::col(EnhancementRequests::Success)))
        .expr(Func::sum(Expr::col(EnhancementRequests::DurationSeconds)))
        .expr(Func::avg(Expr::col(EnhancementRequests::ProcessingTime)))
        .expr(Func::sum(Expr::col(EnhancementRequests::FileSizeMb)))
        .from(EnhancementRequests::Table)
        .and_where(Expr::col(EnhancementRequests::Date).eq(date))
        .to_string(SqliteQueryBuilder)
}

/// SELECT preset, COUNT(id) AS count FROM enhancement_requests
/// WHERE date = ? AND success = 1
/// GROUP BY preset
/// ORDER BY count DESC, preset ASC
pub fn select_preset_counts(date: &str) -> String {
    Query::select()
        .column(EnhancementRequests::Preset)
        .expr_as(
            Func::count(Expr::col(EnhancementRequests::Id)),
            Alias::new("count"),
        )
        .from(EnhancementRequests::Table)
        .and_where(Expr::col(EnhancementRequests::Date).eq(date))
        .and_where(Expr::col(EnhancementRequests::Success).eq(1))
        .group_by_col(EnhancementRequests::Preset)
        .order_by(Alias::new("count"), Order::Desc)
        .order_by(EnhancementRequests::Preset, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT timestamp FROM enhancement_requests WHERE date = ?
pub fn select_timestamps_for_date(date: &str) -> String {
    Query::select()
        .column(EnhancementRequests::Timestamp)
        .from(EnhancementRequests::Table)
        .and_where(Expr::col(EnhancementRequests::Date).eq(date))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, date, timestamp, success, preset, duration_seconds, processing_time,
///        file_size_mb, error_message, enhanced_filename, created_at
/// FROM enhancement_requests WHERE date >= ?
/// ORDER BY timestamp DESC, id DESC LIMIT ?
pub fn select_recent(since_date: &str, limit: u64) -> String {
    Query::select()
        .columns([
            EnhancementRequests::Id,
            EnhancementRequests::Date,
            EnhancementRequests::Timestamp,
            EnhancementRequests::Success,
            EnhancementRequests::Preset,
            EnhancementRequests::DurationSeconds,
            EnhancementRequests::ProcessingTime,
            EnhancementRequests::FileSizeMb,
            EnhancementRequests::ErrorMessage,
            EnhancementRequests::EnhancedFilename,
            EnhancementRequests::CreatedAt,
        ])
        .from(EnhancementRequests::Table)
        .and_where(Expr::col(EnhancementRequests::Date).gte(since_date))
        .order_by(EnhancementRequests::Timestamp, Order::Desc)
        .order_by(EnhancementRequests::Id, Order::Desc)
        .limit(limit)
        .to_string(SqliteQueryBuilder)
}
