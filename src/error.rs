use thiserror::Error;
use uuid::Uuid;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    // Rejected before reaching the store
    #[error("{field} must be a positive quantity, got {value}")]
    InvalidQuantity { field: &'static str, value: i64 },

    #[error("client {0} not found")]
    ClientNotFound(Uuid),

    // Store failures
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("store rejected {op}: {reason}")]
    Rejected { op: &'static str, reason: String },
}
