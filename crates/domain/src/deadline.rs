//! Per-call deadline for store interactions.

use std::future::Future;
use std::time::Duration;

use crate::error::DomainError;

/// Default time a single store call may take.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Bounds every store call made by a service.
///
/// An expired call is reported as [`DomainError::Timeout`]. The store call
/// future is dropped on expiry, so a write either committed before the
/// deadline or is rolled back with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    limit: Duration,
}

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Runs a store call, converting its error into a [`DomainError`].
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = market_store::Result<T>>,
    {
        self.within(operation, call).await?.map_err(DomainError::from)
    }

    /// Runs a store call and hands back the raw store result.
    ///
    /// Used where the caller needs to react to a specific `StoreError`.
    pub async fn within<T, F>(&self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = T>,
    {
        match tokio::time::timeout(self.limit, call).await {
            Ok(output) => Ok(output),
            Err(_) => {
                metrics::counter!("store_timeouts_total", "operation" => operation).increment(1);
                tracing::warn!(operation, limit_ms = self.limit.as_millis() as u64, "store call timed out");
                Err(DomainError::Timeout {
                    operation,
                    after: self.limit,
                })
            }
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_TIMEOUT)
    }
}
