// Library interface for testing

// Declare all modules
pub mod audio;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod constants;
pub mod db;
pub mod enhance;
pub mod error;
pub mod monitoring;
pub mod presets;
pub mod queries;
pub mod schedule;
pub mod schema;
pub mod serve;
pub mod store;
pub mod tasks;

pub use config::Config;
pub use error::EnhanceError;

/// Boxed error used by storage and background code
pub type DynError = Box<dyn std::error::Error + Send + Sync>;
