//! Persistent store for the lot marketplace.
//!
//! The [`MarketStore`] trait is the only way the domain layer touches
//! persisted state. It offers point reads, filtered reads, single-row
//! conditional writes and the multi-row [`ClaimCommit`] transaction.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{ClaimId, LotId, LotStatus, MakerTier, ReturnedProductId, StoreId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryMarketStore;
pub use postgres::PostgresMarketStore;
pub use query::{ClaimQuery, LotQuery};
pub use record::{ClaimRecord, LotRecord, MakerProfileRecord, ReturnedProductRecord, Version};
pub use store::{ClaimCommit, LotTransition, MarketStore, MarketStoreExt, validate_commit};
