/// Base URL of the ai-coustics enhancement API
pub const PROVIDER_API_URL: &str = "https://api.ai-coustics.io/v1";

/// Upper bound for one submit + download exchange with the provider
pub const PROVIDER_TIMEOUT_SECS: u64 = 300;

/// SQLite file name inside the data directory
pub const DB_FILENAME: &str = "audio.db";

/// Output directory name inside the data directory
pub const ENHANCED_DIR_NAME: &str = "enhanced";

/// Prefix shared by every enhanced output file (the sweeper only touches these)
pub const ENHANCED_FILE_PREFIX: &str = "enhanced_";

/// Prefix for raw uploads kept on disk while a request is in flight
pub const TEMP_FILE_PREFIX: &str = "temp_";

/// Number of hex characters of the SHA-256 digest used to name temp files
pub const FINGERPRINT_LEN: usize = 12;

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// `timestamp` column format (local time, microsecond precision)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// `date` column format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp embedded in output file names (14 digits)
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Maximum rows returned by the recent-history query
pub const RECENT_HISTORY_LIMIT: u64 = 100;

/// Days covered by the recent-history query
pub const RECENT_HISTORY_DAYS: u64 = 7;

/// Local hour at which the retention sweep runs
pub const CLEANUP_HOUR: u32 = 3;

/// Seconds before midnight at which the daily summary is posted
pub const SUMMARY_LEAD_SECS: u64 = 600;

/// Pause after a summary so the next cycle starts past midnight
pub const SUMMARY_COOLDOWN_SECS: u64 = 700;

/// Pause after a sweep so an early wake-up cannot trigger a second run
pub const CLEANUP_COOLDOWN_SECS: u64 = 60;

/// Delay before a failed background cycle is retried
pub const BACKGROUND_RETRY_SECS: u64 = 60 * 60;
