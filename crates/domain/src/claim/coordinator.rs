//! Claim coordinator: the concurrency-safe claim and every lifecycle step.

use std::time::Instant;

use chrono::{DateTime, Utc};
use market_store::{
    ClaimId, ClaimQuery, ClaimRecord, LotId, LotRecord, MarketStore, MarketStoreExt,
    ReturnedProductRecord, StoreError, UserId,
};
use serde::Serialize;

use crate::deadline::Deadline;
use crate::error::DomainError;
use crate::reputation::ReputationEngine;

use super::transition::{self, ReturnedItem, Transition};
use super::ClaimStage;

/// Settings for [`ClaimCoordinator`].
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    pub deadline: Deadline,

    /// Reject claims from makers that have not passed KYC.
    pub require_kyc: bool,

    /// Reloads allowed after a lost version-guarded commit.
    pub max_retries: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            deadline: Deadline::default(),
            require_kyc: false,
            max_retries: 10,
        }
    }
}

/// A successful claim: the lot as claimed and its new claim row.
#[derive(Debug, Clone, Serialize)]
pub struct LotClaim {
    pub lot: LotRecord,
    pub claim: ClaimRecord,
}

/// Coordinates claims on lots.
///
/// `claim_lot` is a single conditional write in the store, so at most one of
/// any number of concurrent claims on a lot succeeds. Every later transition
/// reads the claim, applies a pure transition and commits it guarded by the
/// claim version; a lost commit is reloaded and re-evaluated.
#[derive(Clone)]
pub struct ClaimCoordinator<S: MarketStore> {
    store: S,
    reputation: ReputationEngine<S>,
    config: CoordinatorConfig,
}

impl<S: MarketStore> ClaimCoordinator<S> {
    pub fn new(store: S, reputation: ReputationEngine<S>, config: CoordinatorConfig) -> Self {
        Self {
            store,
            reputation,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reputation(&self) -> &ReputationEngine<S> {
        &self.reputation
    }

    /// Claims an available lot for a maker.
    #[tracing::instrument(skip(self))]
    pub async fn claim_lot(&self, lot_id: LotId, maker_id: UserId) -> Result<LotClaim, DomainError> {
        let started = Instant::now();
        let deadline = self.config.deadline;

        let maker = deadline
            .run("get_maker_profile", self.store.require_maker_profile(maker_id))
            .await?;
        if self.config.require_kyc && !maker.kyc_verified {
            return Err(DomainError::validation(format!(
                "maker {maker_id} must complete KYC before claiming"
            )));
        }

        let request = ClaimRecord::open(lot_id, maker_id, Utc::now());
        let result = deadline
            .within("claim_lot", self.store.claim_lot(request))
            .await?;
        metrics::histogram!("claim_lot_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok((lot, claim)) => {
                metrics::counter!("lot_claims_total").increment(1);
                tracing::info!(%lot_id, %maker_id, claim_id = %claim.id, "lot claimed");
                Ok(LotClaim { lot, claim })
            }
            Err(StoreError::StatusMismatch { actual, .. }) => {
                metrics::counter!("lot_claim_conflicts_total").increment(1);
                tracing::warn!(%lot_id, %maker_id, status = %actual, "claim lost, lot not available");
                Err(DomainError::AlreadyClaimed {
                    lot_id,
                    status: actual,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn schedule_pickup(
        &self,
        claim_id: ClaimId,
        when: DateTime<Utc>,
    ) -> Result<ClaimRecord, DomainError> {
        self.advance(claim_id, "schedule_pickup", |claim, _| {
            transition::schedule_pickup(claim, when)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_picked_up(&self, claim_id: ClaimId) -> Result<ClaimRecord, DomainError> {
        self.advance(claim_id, "mark_picked_up", transition::mark_picked_up)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn schedule_return(
        &self,
        claim_id: ClaimId,
        when: DateTime<Utc>,
    ) -> Result<ClaimRecord, DomainError> {
        self.advance(claim_id, "schedule_return", |claim, _| {
            transition::schedule_return(claim, when)
        })
        .await
    }

    /// Records the return and credits the maker with a successful claim.
    #[tracing::instrument(skip(self))]
    pub async fn mark_returned(
        &self,
        claim_id: ClaimId,
        notes: Option<String>,
    ) -> Result<ClaimRecord, DomainError> {
        self.advance(claim_id, "mark_returned", |claim, now| {
            transition::mark_returned(claim, now, notes.clone())
        })
        .await
    }

    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn complete_claim(
        &self,
        claim_id: ClaimId,
        items: Vec<ReturnedItem>,
    ) -> Result<ClaimRecord, DomainError> {
        self.advance(claim_id, "complete_claim", |claim, now| {
            transition::complete(claim, now, &items)
        })
        .await
    }

    /// Cancels an unreturned claim, closing its lot and charging the maker a
    /// failed claim.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_claim(
        &self,
        claim_id: ClaimId,
        reason: Option<String>,
    ) -> Result<ClaimRecord, DomainError> {
        self.advance(claim_id, "cancel_claim", |claim, now| {
            transition::cancel(claim, now, reason.clone())
        })
        .await
    }

    pub async fn get_claim(&self, claim_id: ClaimId) -> Result<ClaimRecord, DomainError> {
        self.config
            .deadline
            .run("get_claim", self.store.require_claim(claim_id))
            .await
    }

    pub async fn claims_for_lot(&self, lot_id: LotId) -> Result<Vec<ClaimRecord>, DomainError> {
        self.config
            .deadline
            .run("query_claims", self.store.query_claims(ClaimQuery::for_lot(lot_id)))
            .await
    }

    /// The newest claim on a lot.
    pub async fn current_claim(&self, lot_id: LotId) -> Result<ClaimRecord, DomainError> {
        self.config
            .deadline
            .run("query_claims", self.store.current_claim_for_lot(lot_id))
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Claim for lot",
                id: lot_id.to_string(),
            })
    }

    pub async fn returned_products(
        &self,
        claim_id: ClaimId,
    ) -> Result<Vec<ReturnedProductRecord>, DomainError> {
        self.config
            .deadline
            .run(
                "returned_products_for_claim",
                self.store.returned_products_for_claim(claim_id),
            )
            .await
    }

    /// Read, transition and commit, reloading after a lost commit.
    ///
    /// A replayed transition reloads the already-advanced claim and fails its
    /// stage check, so nothing is applied twice.
    async fn advance<F>(
        &self,
        claim_id: ClaimId,
        name: &'static str,
        apply: F,
    ) -> Result<ClaimRecord, DomainError>
    where
        F: Fn(&ClaimRecord, DateTime<Utc>) -> Result<Transition, DomainError>,
    {
        let deadline = self.config.deadline;
        let mut retries = 0;
        loop {
            let claim = deadline
                .run("get_claim", self.store.require_claim(claim_id))
                .await?;
            let step = apply(&claim, Utc::now())?;
            let outcome = step.outcome;

            let mut commit = step.into_commit();
            if let Some(outcome) = outcome {
                let profile = deadline
                    .run(
                        "get_maker_profile",
                        self.store.require_maker_profile(claim.maker_id),
                    )
                    .await?;
                commit = commit.with_profile(self.reputation.profile_after(profile, outcome));
            }

            match deadline
                .within("commit_claim", self.store.commit_claim(commit))
                .await?
            {
                Ok(stored) => {
                    metrics::counter!("claim_transitions_total", "transition" => name)
                        .increment(1);
                    if let Some(outcome) = outcome {
                        metrics::counter!("reputation_updates_total", "outcome" => outcome.as_str())
                            .increment(1);
                    }
                    tracing::info!(
                        %claim_id,
                        lot_id = %stored.lot_id,
                        stage = %ClaimStage::of(&stored),
                        transition = name,
                        "claim advanced"
                    );
                    return Ok(stored);
                }
                Err(StoreError::ConcurrencyConflict { entity, .. })
                    if retries < self.config.max_retries =>
                {
                    retries += 1;
                    metrics::counter!("claim_commit_retries_total").increment(1);
                    tracing::warn!(%claim_id, entity, retries, transition = name, "commit lost, reloading");
                }
                Err(StoreError::StatusMismatch {
                    lot_id,
                    expected,
                    actual,
                }) => {
                    tracing::warn!(%claim_id, %lot_id, %expected, %actual, "lot status diverged from claim");
                    return Err(DomainError::invalid_state(
                        "advance claim",
                        format!("lot {lot_id} is {actual}, expected {expected}"),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use market_store::{InMemoryMarketStore, LotStatus, MakerProfileRecord, StoreId};

    use super::*;
    use crate::ErrorKind;
    use crate::reputation::ReputationPolicy;

    fn coordinator(store: InMemoryMarketStore, config: CoordinatorConfig) -> ClaimCoordinator<InMemoryMarketStore> {
        let engine = ReputationEngine::new(store.clone(), ReputationPolicy::default(), config.deadline);
        ClaimCoordinator::new(store, engine, config)
    }

    async fn seed(store: &InMemoryMarketStore) -> (LotId, UserId) {
        let lot = store
            .insert_lot(LotRecord::new(StoreId::new(), UserId::new(), "Milk", "Dairy & Refrigerated", 6))
            .await
            .unwrap();
        let maker = UserId::new();
        store
            .insert_maker_profile(MakerProfileRecord::new(maker, "Mo"))
            .await
            .unwrap();
        (lot.id, maker)
    }

    #[tokio::test]
    async fn claim_marks_lot_claimed() {
        let store = InMemoryMarketStore::new();
        let (lot_id, maker) = seed(&store).await;
        let coordinator = coordinator(store, CoordinatorConfig::default());

        let claimed = coordinator.claim_lot(lot_id, maker).await.unwrap();
        assert_eq!(claimed.lot.status, LotStatus::Claimed);
        assert_eq!(claimed.lot.claimed_by, Some(maker));
        assert_eq!(ClaimStage::of(&claimed.claim), ClaimStage::Claimed);
    }

    #[tokio::test]
    async fn second_claim_is_already_claimed() {
        let store = InMemoryMarketStore::new();
        let (lot_id, maker) = seed(&store).await;
        let other = UserId::new();
        store
            .insert_maker_profile(MakerProfileRecord::new(other, "Lu"))
            .await
            .unwrap();
        let coordinator = coordinator(store, CoordinatorConfig::default());

        coordinator.claim_lot(lot_id, maker).await.unwrap();
        let err = coordinator.claim_lot(lot_id, other).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyClaimed);
    }

    #[tokio::test]
    async fn unknown_maker_or_lot_is_not_found() {
        let store = InMemoryMarketStore::new();
        let (lot_id, maker) = seed(&store).await;
        let coordinator = coordinator(store, CoordinatorConfig::default());

        let err = coordinator.claim_lot(lot_id, UserId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = coordinator.claim_lot(LotId::new(), maker).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn kyc_is_enforced_when_required() {
        let store = InMemoryMarketStore::new();
        let (lot_id, maker) = seed(&store).await;
        let coordinator = coordinator(
            store,
            CoordinatorConfig {
                require_kyc: true,
                ..Default::default()
            },
        );

        let err = coordinator.claim_lot(lot_id, maker).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn return_updates_reputation_in_same_commit() {
        let store = InMemoryMarketStore::new();
        let (lot_id, maker) = seed(&store).await;
        let coordinator = coordinator(store.clone(), CoordinatorConfig::default());

        let claim = coordinator.claim_lot(lot_id, maker).await.unwrap().claim;
        coordinator.mark_picked_up(claim.id).await.unwrap();
        coordinator.mark_returned(claim.id, None).await.unwrap();

        let profile = store.require_maker_profile(maker).await.unwrap();
        assert_eq!(profile.total_claims, 1);
        assert_eq!(profile.successful_returns, 1);
        assert_eq!(profile.rating, 5.0);
        assert_eq!(store.require_lot(lot_id).await.unwrap().status, LotStatus::Returned);
    }

    #[tokio::test]
    async fn replayed_pickup_is_invalid_state() {
        let store = InMemoryMarketStore::new();
        let (lot_id, maker) = seed(&store).await;
        let coordinator = coordinator(store, CoordinatorConfig::default());

        let claim = coordinator.claim_lot(lot_id, maker).await.unwrap().claim;
        coordinator.mark_picked_up(claim.id).await.unwrap();
        let err = coordinator.mark_picked_up(claim.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn current_claim_follows_the_lot() {
        let store = InMemoryMarketStore::new();
        let (lot_id, maker) = seed(&store).await;
        let coordinator = coordinator(store, CoordinatorConfig::default());

        let err = coordinator.current_claim(lot_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let claimed = coordinator.claim_lot(lot_id, maker).await.unwrap();
        coordinator
            .cancel_claim(claimed.claim.id, Some("no van".to_string()))
            .await
            .unwrap();
        let current = coordinator.current_claim(lot_id).await.unwrap();
        assert_eq!(current.id, claimed.claim.id);
        assert_eq!(ClaimStage::of(&current), ClaimStage::Cancelled);
    }

    #[tokio::test]
    async fn unknown_claim_is_not_found() {
        let coordinator = coordinator(InMemoryMarketStore::new(), CoordinatorConfig::default());
        let err = coordinator.mark_picked_up(ClaimId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
