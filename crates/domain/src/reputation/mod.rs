//! Maker reputation: rating, tier and the manual platinum override.

mod engine;
mod policy;

pub use engine::ReputationEngine;
pub use policy::{ClaimOutcome, ReputationPolicy};
