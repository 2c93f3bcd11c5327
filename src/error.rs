#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("event store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("window must cover at least one day, got {0}")]
    InvalidWindow(i64),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
