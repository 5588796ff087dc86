use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{ClaimId, LotId, LotStatus, MakerTier, ReturnedProductId, StoreId, UserId};

/// Row version used for optimistic concurrency control.
///
/// A freshly inserted row is at version 1 and every successful write bumps it
/// by one. A version-guarded write names the version it read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a row that has not been written yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version of a row right after its insert.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A batch of items offered by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotRecord {
    pub id: LotId,
    pub store_id: StoreId,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub items_count: i32,
    pub estimated_weight_kg: Option<f64>,
    pub expiry_date: Option<NaiveDate>,
    pub pickup_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub status: LotStatus,
    pub claimed_by: Option<UserId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

impl LotRecord {
    /// Creates an available lot with no optional attributes set.
    pub fn new(
        store_id: StoreId,
        created_by: UserId,
        title: impl Into<String>,
        category: impl Into<String>,
        items_count: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: LotId::new(),
            store_id,
            title: title.into(),
            description: None,
            category: category.into(),
            items_count,
            estimated_weight_kg: None,
            expiry_date: None,
            pickup_date: None,
            return_date: None,
            status: LotStatus::Available,
            claimed_by: None,
            created_by,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == LotStatus::Available
    }

    /// `claimed_by` is set exactly when the status is past `Available`.
    pub fn claimant_consistent(&self) -> bool {
        self.claimed_by.is_some() == self.status.requires_claimant()
    }
}

/// The relationship between one lot and the maker who claimed it.
///
/// Timestamps are filled strictly in declaration order. `completed_at` and
/// `cancelled_at` are mutually exclusive terminal markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: ClaimId,
    pub lot_id: LotId,
    pub maker_id: UserId,
    pub claimed_at: DateTime<Utc>,
    pub pickup_scheduled_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub return_scheduled_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub version: Version,
}

impl ClaimRecord {
    /// Creates a freshly claimed record.
    pub fn open(lot_id: LotId, maker_id: UserId, claimed_at: DateTime<Utc>) -> Self {
        Self {
            id: ClaimId::new(),
            lot_id,
            maker_id,
            claimed_at,
            pickup_scheduled_at: None,
            picked_up_at: None,
            return_scheduled_at: None,
            returned_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            notes: None,
            version: Version::initial(),
        }
    }

    /// Returns true once no lifecycle transition is permitted.
    pub fn is_closed(&self) -> bool {
        self.completed_at.is_some() || self.cancelled_at.is_some()
    }
}

/// Reputation state for a maker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakerProfileRecord {
    pub user_id: UserId,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub rating: f64,
    pub total_claims: u64,
    pub successful_returns: u64,
    pub maker_tier: MakerTier,
    pub platinum_override: bool,
    pub kyc_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

impl MakerProfileRecord {
    /// Creates a bronze profile with no claim history.
    pub fn new(user_id: UserId, full_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            full_name: full_name.into(),
            phone: None,
            address: None,
            rating: 0.0,
            total_claims: 0,
            successful_returns: 0,
            maker_tier: MakerTier::Bronze,
            platinum_override: false,
            kyc_verified: false,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        }
    }
}

/// A product a maker brought back from a completed claim for resale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnedProductRecord {
    pub id: ReturnedProductId,
    pub claim_id: ClaimId,
    pub product_name: String,
    pub description: Option<String>,
    pub estimated_value: Option<f64>,
    pub approved_for_sale: bool,
    pub review_status: String,
    pub created_at: DateTime<Utc>,
}

impl ReturnedProductRecord {
    pub const PENDING_REVIEW: &'static str = "pending";

    pub fn new(claim_id: ClaimId, product_name: impl Into<String>) -> Self {
        Self {
            id: ReturnedProductId::new(),
            claim_id,
            product_name: product_name.into(),
            description: None,
            estimated_value: None,
            approved_for_sale: false,
            review_status: Self::PENDING_REVIEW.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        assert!(Version::initial() < Version::first());
        assert_eq!(Version::initial().next(), Version::first());
        assert_eq!(Version::new(41).next().as_i64(), 42);
    }

    #[test]
    fn new_lot_is_available_without_claimant() {
        let lot = LotRecord::new(StoreId::new(), UserId::new(), "Yogurt", "Dairy & Refrigerated", 12);
        assert!(lot.is_available());
        assert!(lot.claimant_consistent());
        assert_eq!(lot.version, Version::initial());
    }

    #[test]
    fn claimant_consistency_detects_mismatch() {
        let mut lot = LotRecord::new(StoreId::new(), UserId::new(), "Bread", "Bakery", 3);
        lot.status = LotStatus::Claimed;
        assert!(!lot.claimant_consistent());
        lot.claimed_by = Some(UserId::new());
        assert!(lot.claimant_consistent());
    }

    #[test]
    fn open_claim_is_not_closed() {
        let mut claim = ClaimRecord::open(LotId::new(), UserId::new(), Utc::now());
        assert!(!claim.is_closed());
        claim.cancelled_at = Some(Utc::now());
        assert!(claim.is_closed());
    }

    #[test]
    fn returned_product_defaults_to_pending_review() {
        let product = ReturnedProductRecord::new(ClaimId::new(), "Candle");
        assert!(!product.approved_for_sale);
        assert_eq!(product.review_status, "pending");
    }
}
