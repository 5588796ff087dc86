//! Report shapes.

use chrono::{DateTime, Utc};
use domain::ClaimStage;
use market_store::{
    ClaimId, ClaimRecord, LotId, MakerProfileRecord, MakerTier, StoreId, UserId,
};
use serde::Serialize;

/// Platform-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub total_lots: u64,
    pub available_lots: u64,
    pub total_claims: u64,
    pub registered_makers: u64,
    /// Distinct makers with at least one claim.
    pub active_makers: u64,
    /// Distinct stores with at least one lot.
    pub active_stores: u64,
    /// Mean rating over registered makers, 0 when there are none.
    pub average_rating: f64,
    /// Claims per listed lot.
    pub claim_rate: f64,
    pub waste_diverted_kg: f64,
    pub co2_saved_kg: f64,
}

/// Lot totals for one store, or for every store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub store_id: Option<StoreId>,
    pub total_lots: u64,
    pub available_lots: u64,
    /// Lots in `claimed` status. Lots further along the lifecycle count in
    /// `total_lots` only.
    pub claimed_lots: u64,
    pub waste_diverted_kg: f64,
}

/// One claim in a maker's history, joined with its lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimHistoryEntry {
    pub claim: ClaimRecord,
    pub stage: ClaimStage,
    pub lot_title: Option<String>,
    pub lot_category: Option<String>,
    pub store_id: Option<StoreId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MakerHistory {
    pub profile: MakerProfileRecord,
    pub claims: Vec<ClaimHistoryEntry>,
}

impl MakerHistory {
    /// Claims that are not yet completed or cancelled.
    pub fn open_claims(&self) -> impl Iterator<Item = &ClaimHistoryEntry> {
        self.claims.iter().filter(|entry| !entry.stage.is_terminal())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub full_name: String,
    pub rating: f64,
    pub total_claims: u64,
    pub successful_returns: u64,
    pub maker_tier: MakerTier,
}

impl From<&MakerProfileRecord> for LeaderboardEntry {
    fn from(profile: &MakerProfileRecord) -> Self {
        Self {
            user_id: profile.user_id,
            full_name: profile.full_name.clone(),
            rating: profile.rating,
            total_claims: profile.total_claims,
            successful_returns: profile.successful_returns,
            maker_tier: profile.maker_tier,
        }
    }
}

/// A recent claim with the names needed to display it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub claim_id: ClaimId,
    pub lot_id: LotId,
    pub lot_title: Option<String>,
    pub lot_category: Option<String>,
    pub maker_id: UserId,
    pub maker_name: Option<String>,
    pub stage: ClaimStage,
    pub claimed_at: DateTime<Utc>,
}
