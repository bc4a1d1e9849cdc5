use sea_query::Iden;

/// Request log table - one row per enhancement attempt
#[derive(Iden)]
pub enum EnhancementRequests {
    Table,
    Id,
    Date,
    Timestamp,
    Success,
    Preset,
    DurationSeconds,
    ProcessingTime,
    FileSizeMb,
    ErrorMessage,
    EnhancedFilename,
    CreatedAt,
}
