//! Domain layer for the lot marketplace.
//!
//! This crate provides:
//! - [`LotRepository`] for validated lot CRUD and maker onboarding
//! - [`ClaimCoordinator`] for the at-most-one claim and the claim lifecycle
//! - [`ReputationEngine`] deriving maker rating and tier from claim outcomes
//! - the [`DomainError`] taxonomy and the per-call store [`Deadline`]

pub mod claim;
pub mod deadline;
pub mod error;
pub mod lot;
mod profile;
pub mod reputation;

pub use claim::{ClaimCoordinator, ClaimStage, CoordinatorConfig, LotClaim, ReturnedItem};
pub use deadline::{DEFAULT_STORE_TIMEOUT, Deadline};
pub use error::{DomainError, ErrorKind};
pub use lot::{
    ContactUpdate, KNOWN_CATEGORIES, LotPatch, LotRepository, NewLot, NewMaker, canonical_category,
};
pub use reputation::{ClaimOutcome, ReputationEngine, ReputationPolicy};
