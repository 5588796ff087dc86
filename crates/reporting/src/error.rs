//! Reporting error types.

use domain::{DomainError, ErrorKind};
use market_store::UserId;
use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("Maker profile not found: {0}")]
    MakerNotFound(UserId),

    /// A store read failed or exceeded its deadline.
    #[error(transparent)]
    Read(#[from] DomainError),
}

impl ReportingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportingError::MakerNotFound(_) => ErrorKind::NotFound,
            ReportingError::Read(e) => e.kind(),
        }
    }
}

/// Result type for reporting operations.
pub type Result<T> = std::result::Result<T, ReportingError>;
