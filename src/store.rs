//! Append-only request log backed by SQLite
//!
//! Every operation opens its own connection, so the store can be cloned into
//! request handlers and background tasks without any shared state.

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use log::{error, warn};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use sqlx::Row;
use std::path::{Path, PathBuf};

use crate::constants::{
    DATE_FORMAT, ENHANCED_FILE_PREFIX, RECENT_HISTORY_DAYS, RECENT_HISTORY_LIMIT,
    TIMESTAMP_FORMAT,
};
use crate::db;
use crate::queries::requests;
use crate::DynError;

/// Outcome of one enhancement attempt, ready to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogEntry {
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
    pub success: bool,
    pub preset: String,
    pub duration_seconds: f64,
    pub processing_time: f64,
    pub file_size_mb: f64,
    pub error_message: Option<String>,
    pub enhanced_filename: Option<String>,
}

impl RequestLogEntry {
    pub fn success(
        at: NaiveDateTime,
        preset: &str,
        duration_seconds: f64,
        processing_time: f64,
        file_size_mb: f64,
        enhanced_filename: &str,
    ) -> Self {
        Self {
            date: at.date(),
            timestamp: at,
            success: true,
            preset: preset.to_string(),
            duration_seconds,
            processing_time,
            file_size_mb,
            error_message: None,
            enhanced_filename: Some(enhanced_filename.to_string()),
        }
    }

    pub fn failure(at: NaiveDateTime, preset: &str, error_message: &str) -> Self {
        Self {
            date: at.date(),
            timestamp: at,
            success: false,
            preset: preset.to_string(),
            duration_seconds: 0.0,
            processing_time: 0.0,
            file_size_mb: 0.0,
            error_message: Some(error_message.to_string()),
            enhanced_filename: None,
        }
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// A stored row as returned by history queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRecord {
    pub id: i64,
    pub date: String,
    pub timestamp: String,
    pub success: bool,
    pub preset: Option<String>,
    pub duration_seconds: Option<f64>,
    pub processing_time: Option<f64>,
    pub file_size_mb: Option<f64>,
    pub error_message: Option<String>,
    pub enhanced_filename: Option<String>,
    pub created_at: Option<String>,
}

/// Aggregate statistics for one calendar day
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyStats {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub total_audio_minutes: f64,
    pub avg_processing_seconds: f64,
    pub total_size_mb: f64,
    /// Successful requests per preset, most used first
    #[serde(serialize_with = "serialize_preset_counts")]
    pub presets: Vec<(String, i64)>,
}

impl DailyStats {
    pub fn preset_count(&self, preset: &str) -> Option<i64> {
        self.presets
            .iter()
            .find(|(name, _)| name == preset)
            .map(|(_, count)| *count)
    }

    /// Percentage of successful requests, one decimal place
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        round_to(self.successful as f64 / self.total as f64 * 100.0, 1)
    }
}

fn serialize_preset_counts<S: Serializer>(
    presets: &[(String, i64)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(presets.len()))?;
    for (name, count) in presets {
        map.serialize_entry(name, count)?;
    }
    map.end()
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone)]
pub struct LogStore {
    db_path: PathBuf,
    enhanced_dir: PathBuf,
}

impl LogStore {
    pub fn new(db_path: impl Into<PathBuf>, enhanced_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            enhanced_dir: enhanced_dir.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Create the table and index if needed and migrate older layouts. Idempotent.
    pub async fn initialize(&self) -> Result<(), DynError> {
        let mut conn = db::open_connection(&self.db_path).await?;
        db::init_database_schema(&mut conn).await
    }

    pub async fn append(&self, entry: &RequestLogEntry) -> Result<(), DynError> {
        let mut conn = db::open_connection(&self.db_path).await?;
        sqlx::query(&requests::insert(entry))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn stats_for_today(&self) -> DailyStats {
        self.stats_for_date(Local::now().date_naive()).await
    }

    /// Statistics for one day; any failure yields zeroed stats
    pub async fn stats_for_date(&self, date: NaiveDate) -> DailyStats {
        match self.try_stats_for_date(date).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Stats error: {}", e);
                DailyStats::default()
            }
        }
    }

    async fn try_stats_for_date(&self, date: NaiveDate) -> Result<DailyStats, DynError> {
        let date = date.format(DATE_FORMAT).to_string();
        let mut conn = db::open_connection(&self.db_path).await?;

        let row = sqlx::query(&requests::select_daily_totals(&date))
            .fetch_one(&mut conn)
            .await?;
        let total: i64 = row.try_get(0)?;
        let successful: Option<i64> = row.try_get(1)?;
        let total_duration: Option<f64> = row.try_get(2)?;
        let avg_processing: Option<f64> = row.try_get(3)?;
        let total_size: Option<f64> = row.try_get(4)?;

        let preset_rows = sqlx::query(&requests::select_preset_counts(&date))
            .fetch_all(&mut conn)
            .await?;
        let mut presets = Vec::with_capacity(preset_rows.len());
        for row in preset_rows {
            let preset: Option<String> = row.try_get(0)?;
            let count: i64 = row.try_get(1)?;
            presets.push((preset.unwrap_or_else(|| "unknown".to_string()), count));
        }

        let successful = successful.unwrap_or(0);
        Ok(DailyStats {
            total,
            successful,
            failed: total - successful,
            total_audio_minutes: round_to(total_duration.unwrap_or(0.0) / 60.0, 2),
            avg_processing_seconds: round_to(avg_processing.unwrap_or(0.0), 2),
            total_size_mb: round_to(total_size.unwrap_or(0.0), 2),
            presets,
        })
    }

    /// Number of requests per local hour for the given day
    pub async fn hourly_counts(&self, date: NaiveDate) -> Result<[u32; 24], DynError> {
        let date = date.format(DATE_FORMAT).to_string();
        let mut conn = db::open_connection(&self.db_path).await?;
        let rows = sqlx::query(&requests::select_timestamps_for_date(&date))
            .fetch_all(&mut conn)
            .await?;

        let mut hours = [0u32; 24];
        for row in rows {
            let timestamp: String = row.try_get(0)?;
            match parse_timestamp(&timestamp) {
                Some(ts) => hours[ts.hour() as usize] += 1,
                None => warn!("Skipping unparseable timestamp '{}'", timestamp),
            }
        }
        Ok(hours)
    }

    pub async fn recent_week(&self) -> Result<Vec<RequestRecord>, DynError> {
        self.recent_week_from(Local::now().naive_local()).await
    }

    /// Up to 100 rows from the 7 days before `now`, newest first
    ///
    /// Successful rows without a stored output name get one attached by matching
    /// the minute of their timestamp against files on disk. Best effort only.
    pub async fn recent_week_from(&self, now: NaiveDateTime) -> Result<Vec<RequestRecord>, DynError> {
        let since = now.date() - chrono::Days::new(RECENT_HISTORY_DAYS);
        let since = since.format(DATE_FORMAT).to_string();

        let mut conn = db::open_connection(&self.db_path).await?;
        let rows = sqlx::query(&requests::select_recent(&since, RECENT_HISTORY_LIMIT))
            .fetch_all(&mut conn)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let success: i64 = row.try_get("success")?;
            records.push(RequestRecord {
                id: row.try_get("id")?,
                date: row.try_get("date")?,
                timestamp: row.try_get("timestamp")?,
                success: success != 0,
                preset: row.try_get("preset")?,
                duration_seconds: row.try_get("duration_seconds")?,
                processing_time: row.try_get("processing_time")?,
                file_size_mb: row.try_get("file_size_mb")?,
                error_message: row.try_get("error_message")?,
                enhanced_filename: row.try_get("enhanced_filename")?,
                created_at: row.try_get("created_at")?,
            });
        }

        if records
            .iter()
            .any(|r| r.success && r.enhanced_filename.is_none())
        {
            let files = list_enhanced_files(&self.enhanced_dir).await;
            reconcile_filenames(&mut records, &files);
        }

        Ok(records)
    }
}

pub fn parse_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Minute-precision key (YYYYMMDDHHMM) used to match a record against output file names
pub fn filename_match_key(timestamp: &str) -> Option<String> {
    parse_timestamp(timestamp).map(|ts| ts.format("%Y%m%d%H%M").to_string())
}

/// Attach the first file whose name contains the record's minute key
pub fn reconcile_filenames(records: &mut [RequestRecord], files: &[String]) {
    for record in records
        .iter_mut()
        .filter(|r| r.success && r.enhanced_filename.is_none())
    {
        if let Some(key) = filename_match_key(&record.timestamp) {
            record.enhanced_filename = files.iter().find(|f| f.contains(&key)).cloned();
        }
    }
}

/// Sorted names of enhanced output files; empty if the directory cannot be read
async fn list_enhanced_files(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan {} for output files: {}", dir.display(), e);
            return files;
        }
    };
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with(ENHANCED_FILE_PREFIX) {
                    files.push(name);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error while scanning {}: {}", dir.display(), e);
                break;
            }
        }
    }
    files.sort();
    files
}
