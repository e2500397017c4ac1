/// Failure taxonomy for one synchronization attempt.
///
/// Every variant aborts the attempt with the store untouched (store errors
/// roll back their transaction). An empty remote result is not an error and
/// never reaches this type.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("normalization failed: {0}")]
    Normalize(String),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("stored max timestamp {0:?} is not a valid timestamp")]
    CorruptCursor(String),
    #[error("timestamp formatting failed: {0}")]
    TimestampFormat(#[from] time::error::Format),
    #[error("view artifact write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("view artifact encoding failed: {0}")]
    Csv(#[from] csv::Error),
}
