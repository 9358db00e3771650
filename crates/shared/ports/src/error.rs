use thiserror::Error;

/// Failures of the key-value session store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure to record a transaction (never fails the trade itself)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transaction recorder error: {0}")]
pub struct RecorderError(pub String);

/// Failures of the external custom strategy generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupplierError {
    #[error("Strategy generator unavailable: {0}")]
    Unavailable(String),

    #[error("Strategy generator returned no code")]
    Empty,
}
