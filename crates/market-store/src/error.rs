use thiserror::Error;

use crate::{ClaimId, LotId, LotStatus, UserId, Version};

/// Errors that can occur when interacting with the market store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Lot not found: {0}")]
    LotNotFound(LotId),

    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    #[error("Maker profile not found: {0}")]
    MakerNotFound(UserId),

    /// A conditional write on a lot's status found a different status.
    #[error("Lot {lot_id} status mismatch: expected {expected}, found {actual}")]
    StatusMismatch {
        lot_id: LotId,
        expected: LotStatus,
        actual: LotStatus,
    },

    /// A version-guarded write lost to a concurrent writer.
    #[error("Concurrency conflict on {entity} {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    #[error("Duplicate {entity}: {id}")]
    Duplicate { entity: &'static str, id: String },

    /// The lot is referenced by at least one claim and cannot be removed.
    #[error("Lot {0} has claims")]
    HasClaims(LotId),

    /// A commit was malformed before it reached storage.
    #[error("Invalid commit: {0}")]
    InvalidCommit(String),

    /// A read carried a filter or page bound the backend cannot honour.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A stored value could not be mapped back into a record.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
