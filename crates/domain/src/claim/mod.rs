//! Claim lifecycle: stages, pure transitions and the coordinator.

mod coordinator;
mod stage;
pub mod transition;

pub use coordinator::{ClaimCoordinator, CoordinatorConfig, LotClaim};
pub use stage::ClaimStage;
pub use transition::{ReturnedItem, Transition};
