//! Daily removal of enhanced files older than the retention window

use chrono::Local;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

use crate::constants::{
    BACKGROUND_RETRY_SECS, BYTES_PER_MB, CLEANUP_COOLDOWN_SECS, CLEANUP_HOUR,
    ENHANCED_FILE_PREFIX,
};
use crate::schedule;
use crate::DynError;

/// What one sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed_count: u64,
    pub removed_bytes: u64,
}

impl SweepReport {
    pub fn removed_mb(&self) -> f64 {
        self.removed_bytes as f64 / BYTES_PER_MB as f64
    }
}

/// Delete `enhanced_*` regular files last modified more than `retention` before `now`
///
/// A missing directory is not an error. Files that vanish or cannot be removed
/// mid-sweep are logged and skipped.
pub async fn sweep_once(
    dir: &Path,
    retention: Duration,
    now: SystemTime,
) -> Result<SweepReport, DynError> {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(ENHANCED_FILE_PREFIX) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if modified >= cutoff {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                report.removed_count += 1;
                report.removed_bytes += metadata.len();
            }
            Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
        }
    }

    if report.removed_count > 0 {
        info!(
            "Cleaned up {} files, freed {:.2} MB",
            report.removed_count,
            report.removed_mb()
        );
    }
    Ok(report)
}

/// Sweep `dir` every day at 03:00 local time until cancelled
pub async fn run_cleanup_loop(dir: PathBuf, retention: Duration, cancel: CancellationToken) {
    let at = schedule::time_of_day(CLEANUP_HOUR, 0);
    info!(
        "Retention sweeper started for {} (keeping {} days)",
        dir.display(),
        retention.as_secs() / 86400
    );

    loop {
        let wait = schedule::duration_until_next_daily_run(Local::now().naive_local(), at);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let pause = match sweep_once(&dir, retention, SystemTime::now()).await {
            Ok(_) => Duration::from_secs(CLEANUP_COOLDOWN_SECS),
            Err(e) => {
                error!("Cleanup error: {}", e);
                Duration::from_secs(BACKGROUND_RETRY_SECS)
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    info!("Retention sweeper stopped");
}
