//! Shared types for the lot marketplace.
//!
//! Identifiers are newtypes over UUIDs so a lot id can never be passed where a
//! claim id is expected. The lifecycle and tier enums live here because both
//! the store and the domain layer need them.

pub mod status;
pub mod types;

pub use status::{LotStatus, MakerTier, ParseEnumError};
pub use types::{ClaimId, LotId, ReturnedProductId, StoreId, UserId};
