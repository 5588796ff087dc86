//! Lot listing and maker onboarding.

mod commands;
mod repository;
mod validation;

pub use commands::{ContactUpdate, LotPatch, NewLot, NewMaker};
pub use repository::LotRepository;
pub use validation::{KNOWN_CATEGORIES, canonical_category};
