use market_store::{ClaimRecord, LotStatus};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a claim, derived from which timestamps are set.
///
/// ```text
/// Claimed ──► PickedUp ──► Returned ──► Completed
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStage {
    Claimed,
    PickedUp,
    Returned,
    Completed,
    Cancelled,
}

impl ClaimStage {
    pub fn of(claim: &ClaimRecord) -> Self {
        if claim.cancelled_at.is_some() {
            ClaimStage::Cancelled
        } else if claim.completed_at.is_some() {
            ClaimStage::Completed
        } else if claim.returned_at.is_some() {
            ClaimStage::Returned
        } else if claim.picked_up_at.is_some() {
            ClaimStage::PickedUp
        } else {
            ClaimStage::Claimed
        }
    }

    /// The status the claim's lot must have while the claim is at this stage.
    pub fn lot_status(&self) -> LotStatus {
        match self {
            ClaimStage::Claimed => LotStatus::Claimed,
            ClaimStage::PickedUp => LotStatus::PickedUp,
            ClaimStage::Returned => LotStatus::Returned,
            ClaimStage::Completed | ClaimStage::Cancelled => LotStatus::Completed,
        }
    }

    /// Returns true if no transition is possible from this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimStage::Completed | ClaimStage::Cancelled)
    }

    /// Cancellation is allowed until the products come back.
    pub fn can_cancel(&self) -> bool {
        matches!(self, ClaimStage::Claimed | ClaimStage::PickedUp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStage::Claimed => "claimed",
            ClaimStage::PickedUp => "picked_up",
            ClaimStage::Returned => "returned",
            ClaimStage::Completed => "completed",
            ClaimStage::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ClaimStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
