use crate::cache::CacheError;
use crate::database::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
///
/// `QuotaExceeded` is an expected admission-control signal: it terminates the
/// remainder of the current batch early and is never treated as a bug. The
/// persistence variants (`NotFound`, `BrandMismatch`) roll back the whole
/// transaction for the prompt that triggered them.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("quota exceeded for {counter}: {attempted}/{limit}")]
    QuotaExceeded {
        counter: String,
        attempted: i64,
        limit: f64,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("prompt {prompt_id} does not belong to brand {brand_id}")]
    BrandMismatch { prompt_id: Uuid, brand_id: Uuid },
    #[error("classification error: {0}")]
    Classification(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("job error: {0}")]
    Job(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AppError {
    /// Whether this error must stop the remainder of the batch.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppError::QuotaExceeded { .. })
    }
}
