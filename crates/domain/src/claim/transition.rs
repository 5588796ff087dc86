//! Pure lifecycle transitions.
//!
//! Each function takes the claim as read, validates its stage and returns the
//! rewritten claim together with the lot status change and reputation outcome
//! that must be committed with it. Nothing here touches the store.

use chrono::{DateTime, Utc};
use market_store::{ClaimCommit, ClaimRecord, LotStatus, ReturnedProductRecord};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::reputation::ClaimOutcome;

use super::ClaimStage;

/// An item the maker reports for resale when completing a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnedItem {
    pub product_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<f64>,
}

impl ReturnedItem {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            description: None,
            estimated_value: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.estimated_value = Some(value);
        self
    }
}

/// The outcome of a successful transition, ready to be committed.
#[derive(Debug, Clone)]
pub struct Transition {
    pub claim: ClaimRecord,
    pub lot: Option<(LotStatus, LotStatus)>,
    pub outcome: Option<ClaimOutcome>,
    pub returned_products: Vec<ReturnedProductRecord>,
}

impl Transition {
    fn claim_only(claim: ClaimRecord) -> Self {
        Self {
            claim,
            lot: None,
            outcome: None,
            returned_products: Vec::new(),
        }
    }

    fn moving_lot(claim: ClaimRecord, from: LotStatus, to: LotStatus) -> Self {
        Self {
            lot: Some((from, to)),
            ..Self::claim_only(claim)
        }
    }

    /// Builds the store commit, without the profile write.
    pub fn into_commit(self) -> ClaimCommit {
        let mut commit = ClaimCommit::new(self.claim);
        if let Some((from, to)) = self.lot {
            commit = commit.advance_lot(from, to);
        }
        commit.with_returned_products(self.returned_products)
    }
}

fn require_stage(
    claim: &ClaimRecord,
    action: &'static str,
    allowed: &[ClaimStage],
) -> Result<ClaimStage, DomainError> {
    let stage = ClaimStage::of(claim);
    if allowed.contains(&stage) {
        Ok(stage)
    } else {
        Err(DomainError::invalid_state(action, format!("claim is {stage}")))
    }
}

pub fn schedule_pickup(claim: &ClaimRecord, when: DateTime<Utc>) -> Result<Transition, DomainError> {
    require_stage(claim, "schedule pickup", &[ClaimStage::Claimed])?;
    let mut next = claim.clone();
    next.pickup_scheduled_at = Some(when);
    Ok(Transition::claim_only(next))
}

pub fn mark_picked_up(claim: &ClaimRecord, now: DateTime<Utc>) -> Result<Transition, DomainError> {
    require_stage(claim, "mark picked up", &[ClaimStage::Claimed])?;
    let mut next = claim.clone();
    next.picked_up_at = Some(now);
    Ok(Transition::moving_lot(
        next,
        LotStatus::Claimed,
        LotStatus::PickedUp,
    ))
}

pub fn schedule_return(claim: &ClaimRecord, when: DateTime<Utc>) -> Result<Transition, DomainError> {
    require_stage(claim, "schedule return", &[ClaimStage::PickedUp])?;
    let mut next = claim.clone();
    next.return_scheduled_at = Some(when);
    Ok(Transition::claim_only(next))
}

/// Records the return. This is the claim's successful reputation outcome.
pub fn mark_returned(
    claim: &ClaimRecord,
    now: DateTime<Utc>,
    notes: Option<String>,
) -> Result<Transition, DomainError> {
    require_stage(claim, "mark returned", &[ClaimStage::PickedUp])?;
    let mut next = claim.clone();
    next.returned_at = Some(now);
    if notes.is_some() {
        next.notes = notes;
    }
    let mut transition = Transition::moving_lot(next, LotStatus::PickedUp, LotStatus::Returned);
    transition.outcome = Some(ClaimOutcome::Success);
    Ok(transition)
}

pub fn complete(
    claim: &ClaimRecord,
    now: DateTime<Utc>,
    items: &[ReturnedItem],
) -> Result<Transition, DomainError> {
    require_stage(claim, "complete", &[ClaimStage::Returned])?;
    validate_items(items)?;

    let mut next = claim.clone();
    next.completed_at = Some(now);
    let mut transition = Transition::moving_lot(next, LotStatus::Returned, LotStatus::Completed);
    transition.returned_products = items
        .iter()
        .map(|item| {
            let mut product = ReturnedProductRecord::new(claim.id, item.product_name.trim());
            product.description = item.description.clone();
            product.estimated_value = item.estimated_value;
            product.created_at = now;
            product
        })
        .collect();
    Ok(transition)
}

/// Cancels a claim that has not been returned. The lot is closed and the
/// maker is charged a failed claim.
pub fn cancel(
    claim: &ClaimRecord,
    now: DateTime<Utc>,
    reason: Option<String>,
) -> Result<Transition, DomainError> {
    let stage = ClaimStage::of(claim);
    if !stage.can_cancel() {
        return Err(DomainError::invalid_state("cancel", format!("claim is {stage}")));
    }
    let mut next = claim.clone();
    next.cancelled_at = Some(now);
    next.cancellation_reason = reason;
    let mut transition = Transition::moving_lot(next, stage.lot_status(), LotStatus::Completed);
    transition.outcome = Some(ClaimOutcome::Failure);
    Ok(transition)
}

fn validate_items(items: &[ReturnedItem]) -> Result<(), DomainError> {
    for item in items {
        if item.product_name.trim().is_empty() {
            return Err(DomainError::validation("returned product name must not be empty"));
        }
        if let Some(value) = item.estimated_value
            && !(value.is_finite() && value >= 0.0)
        {
            return Err(DomainError::validation(format!(
                "estimated value of {} must be a non-negative number",
                item.product_name
            )));
        }
    }
    Ok(())
}
