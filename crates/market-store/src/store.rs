use async_trait::async_trait;

use crate::{
    ClaimId, ClaimQuery, ClaimRecord, LotId, LotQuery, LotRecord, LotStatus, MakerProfileRecord,
    Result, ReturnedProductRecord, StoreError, UserId, Version,
};

/// A guarded change of a lot's status, applied only if the lot is still at
/// `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotTransition {
    pub lot_id: LotId,
    pub from: LotStatus,
    pub to: LotStatus,
}

/// A multi-row write centred on one claim.
///
/// Everything in a commit is applied in a single transaction or not at all:
/// the claim row (guarded by `expected_version`), an optional lot status
/// change (guarded by the lot's current status), an optional maker profile
/// write (guarded by its own expected version) and any returned products to
/// insert.
#[derive(Debug, Clone)]
pub struct ClaimCommit {
    pub claim: ClaimRecord,
    pub expected_version: Version,
    pub lot_transition: Option<LotTransition>,
    pub profile: Option<(MakerProfileRecord, Version)>,
    pub returned_products: Vec<ReturnedProductRecord>,
}

impl ClaimCommit {
    /// Starts a commit that rewrites `claim`, which was read at its current
    /// version.
    pub fn new(claim: ClaimRecord) -> Self {
        let expected_version = claim.version;
        Self {
            claim,
            expected_version,
            lot_transition: None,
            profile: None,
            returned_products: Vec::new(),
        }
    }

    /// Moves the claim's lot from `from` to `to` in the same transaction.
    pub fn advance_lot(mut self, from: LotStatus, to: LotStatus) -> Self {
        self.lot_transition = Some(LotTransition {
            lot_id: self.claim.lot_id,
            from,
            to,
        });
        self
    }

    /// Writes the maker profile; `profile.version` must be the version read.
    pub fn with_profile(mut self, profile: MakerProfileRecord) -> Self {
        let expected = profile.version;
        self.profile = Some((profile, expected));
        self
    }

    pub fn with_returned_products(mut self, products: Vec<ReturnedProductRecord>) -> Self {
        self.returned_products = products;
        self
    }
}

/// Core trait for market store implementations.
///
/// All implementations must be thread-safe and every guarded write must be
/// atomic with respect to its guard: a write either observes the expected
/// version or status and applies, or applies nothing.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Inserts a new lot at [`Version::first`].
    async fn insert_lot(&self, lot: LotRecord) -> Result<LotRecord>;

    async fn get_lot(&self, lot_id: LotId) -> Result<Option<LotRecord>>;

    /// Replaces a lot's attributes if its stored version equals `lot.version`.
    ///
    /// Fails with `ConcurrencyConflict` otherwise. Returns the stored row.
    async fn update_lot(&self, lot: LotRecord) -> Result<LotRecord>;

    /// Deletes a lot. Fails with `HasClaims` if any claim references it.
    async fn delete_lot(&self, lot_id: LotId) -> Result<()>;

    async fn query_lots(&self, query: LotQuery) -> Result<Vec<LotRecord>>;

    /// Claims an available lot and inserts `claim` in one conditional write.
    ///
    /// The lot moves to `Claimed` with `claimed_by = claim.maker_id` only if
    /// its status is `Available` at the moment of the write. Otherwise fails
    /// with `StatusMismatch` (or `LotNotFound`) and nothing is written.
    async fn claim_lot(&self, claim: ClaimRecord) -> Result<(LotRecord, ClaimRecord)>;

    async fn get_claim(&self, claim_id: ClaimId) -> Result<Option<ClaimRecord>>;

    async fn query_claims(&self, query: ClaimQuery) -> Result<Vec<ClaimRecord>>;

    /// Applies a [`ClaimCommit`] atomically and returns the stored claim.
    async fn commit_claim(&self, commit: ClaimCommit) -> Result<ClaimRecord>;

    /// Fails with `Duplicate` if a profile already exists for the user.
    async fn insert_maker_profile(&self, profile: MakerProfileRecord)
    -> Result<MakerProfileRecord>;

    async fn get_maker_profile(&self, user_id: UserId) -> Result<Option<MakerProfileRecord>>;

    /// Version-guarded profile write, see [`MarketStore::update_lot`].
    async fn update_maker_profile(&self, profile: MakerProfileRecord)
    -> Result<MakerProfileRecord>;

    async fn list_maker_profiles(&self) -> Result<Vec<MakerProfileRecord>>;

    async fn returned_products_for_claim(
        &self,
        claim_id: ClaimId,
    ) -> Result<Vec<ReturnedProductRecord>>;
}

/// Convenience methods layered over [`MarketStore`].
#[async_trait]
pub trait MarketStoreExt: MarketStore {
    /// Loads a lot, failing with `LotNotFound` if absent.
    async fn require_lot(&self, lot_id: LotId) -> Result<LotRecord> {
        self.get_lot(lot_id)
            .await?
            .ok_or(StoreError::LotNotFound(lot_id))
    }

    async fn require_claim(&self, claim_id: ClaimId) -> Result<ClaimRecord> {
        self.get_claim(claim_id)
            .await?
            .ok_or(StoreError::ClaimNotFound(claim_id))
    }

    async fn require_maker_profile(&self, user_id: UserId) -> Result<MakerProfileRecord> {
        self.get_maker_profile(user_id)
            .await?
            .ok_or(StoreError::MakerNotFound(user_id))
    }

    /// Returns the most recent claim on a lot, if any.
    async fn current_claim_for_lot(&self, lot_id: LotId) -> Result<Option<ClaimRecord>> {
        Ok(self
            .query_claims(ClaimQuery::for_lot(lot_id).limit(1))
            .await?
            .into_iter()
            .next())
    }
}

impl<T: MarketStore + ?Sized> MarketStoreExt for T {}

/// Checks a commit for internal consistency before it is applied.
pub fn validate_commit(commit: &ClaimCommit) -> Result<()> {
    if let Some(transition) = commit.lot_transition {
        if transition.lot_id != commit.claim.lot_id {
            return Err(StoreError::InvalidCommit(
                "lot transition must target the claim's lot".to_string(),
            ));
        }
        if !transition.from.can_advance_to(transition.to) {
            return Err(StoreError::InvalidCommit(format!(
                "lot status cannot move from {} to {}",
                transition.from, transition.to
            )));
        }
    }

    if let Some((profile, _)) = &commit.profile
        && profile.user_id != commit.claim.maker_id
    {
        return Err(StoreError::InvalidCommit(
            "profile must belong to the claiming maker".to_string(),
        ));
    }

    if let Some((profile, _)) = &commit.profile
        && profile.successful_returns > profile.total_claims
    {
        return Err(StoreError::InvalidCommit(
            "successful_returns cannot exceed total_claims".to_string(),
        ));
    }

    if commit
        .returned_products
        .iter()
        .any(|p| p.claim_id != commit.claim.id)
    {
        return Err(StoreError::InvalidCommit(
            "returned products must reference the committed claim".to_string(),
        ));
    }

    Ok(())
}
