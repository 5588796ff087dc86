use market_store::{MakerProfileRecord, MakerTier, MarketStore, MarketStoreExt, UserId};

use crate::deadline::Deadline;
use crate::error::DomainError;
use crate::profile::modify_profile;

use super::{ClaimOutcome, ReputationPolicy};

/// Maintains maker reputation.
///
/// Terminal claim outcomes are folded in by the claim coordinator as part of
/// its claim commit (see [`ReputationEngine::profile_after`]). The engine's
/// own writes cover the manual platinum override and recomputation.
#[derive(Clone)]
pub struct ReputationEngine<S: MarketStore> {
    store: S,
    policy: ReputationPolicy,
    deadline: Deadline,
}

impl<S: MarketStore> ReputationEngine<S> {
    pub fn new(store: S, policy: ReputationPolicy, deadline: Deadline) -> Self {
        Self {
            store,
            policy,
            deadline,
        }
    }

    pub fn policy(&self) -> &ReputationPolicy {
        &self.policy
    }

    pub fn tier_for(&self, total_claims: u64, rating: f64, platinum_override: bool) -> MakerTier {
        self.policy.tier_for(total_claims, rating, platinum_override)
    }

    /// The profile that results from one terminal outcome.
    pub fn profile_after(
        &self,
        profile: MakerProfileRecord,
        outcome: ClaimOutcome,
    ) -> MakerProfileRecord {
        self.policy.apply_outcome(profile, outcome)
    }

    #[tracing::instrument(skip(self))]
    pub async fn promote_to_platinum(
        &self,
        user_id: UserId,
    ) -> Result<MakerProfileRecord, DomainError> {
        let profile = self.set_override(user_id, true).await?;
        tracing::info!(%user_id, "maker promoted to platinum");
        Ok(profile)
    }

    #[tracing::instrument(skip(self))]
    pub async fn revoke_platinum(&self, user_id: UserId) -> Result<MakerProfileRecord, DomainError> {
        let profile = self.set_override(user_id, false).await?;
        tracing::info!(%user_id, tier = %profile.maker_tier, "platinum override revoked");
        Ok(profile)
    }

    /// Re-derives rating and tier from the stored counters.
    ///
    /// Writes nothing if the derived values already match.
    #[tracing::instrument(skip(self))]
    pub async fn recompute(&self, user_id: UserId) -> Result<MakerProfileRecord, DomainError> {
        let current = self
            .deadline
            .run("get_maker_profile", self.store.require_maker_profile(user_id))
            .await?;
        let derived = self.policy.rederive(current.clone());
        if derived.rating == current.rating && derived.maker_tier == current.maker_tier {
            return Ok(current);
        }

        let policy = self.policy;
        let profile = modify_profile(&self.store, &self.deadline, user_id, |profile| {
            Ok(policy.rederive(profile))
        })
        .await?;
        metrics::counter!("reputation_updates_total", "outcome" => "recompute").increment(1);
        Ok(profile)
    }

    async fn set_override(
        &self,
        user_id: UserId,
        platinum_override: bool,
    ) -> Result<MakerProfileRecord, DomainError> {
        let policy = self.policy;
        let profile = modify_profile(&self.store, &self.deadline, user_id, |mut profile| {
            profile.platinum_override = platinum_override;
            Ok(policy.rederive(profile))
        })
        .await?;
        metrics::counter!("reputation_updates_total", "outcome" => "override").increment(1);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use market_store::InMemoryMarketStore;

    use super::*;
    use crate::ErrorKind;

    async fn engine_with_maker() -> (ReputationEngine<InMemoryMarketStore>, UserId) {
        let store = InMemoryMarketStore::new();
        let user_id = UserId::new();
        let mut profile = MakerProfileRecord::new(user_id, "Priya");
        profile.total_claims = 12;
        profile.successful_returns = 12;
        store.insert_maker_profile(profile).await.unwrap();
        let engine = ReputationEngine::new(store, ReputationPolicy::default(), Deadline::default());
        (engine, user_id)
    }

    #[tokio::test]
    async fn promote_and_revoke_platinum() {
        let (engine, user_id) = engine_with_maker().await;

        let promoted = engine.promote_to_platinum(user_id).await.unwrap();
        assert_eq!(promoted.maker_tier, MakerTier::Platinum);
        assert!(promoted.platinum_override);

        let revoked = engine.revoke_platinum(user_id).await.unwrap();
        assert!(!revoked.platinum_override);
        assert_eq!(revoked.maker_tier, MakerTier::Silver);
    }

    #[tokio::test]
    async fn recompute_fixes_stale_derived_fields() {
        let (engine, user_id) = engine_with_maker().await;

        let profile = engine.recompute(user_id).await.unwrap();
        assert_eq!(profile.rating, 5.0);
        assert_eq!(profile.maker_tier, MakerTier::Silver);

        let again = engine.recompute(user_id).await.unwrap();
        assert_eq!(again.version, profile.version);
    }

    #[tokio::test]
    async fn unknown_maker_is_not_found() {
        let (engine, _) = engine_with_maker().await;
        let err = engine.promote_to_platinum(UserId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn override_survives_concurrent_toggles() {
        let (engine, user_id) = engine_with_maker().await;
        let (a, b) = tokio::join!(
            engine.promote_to_platinum(user_id),
            engine.recompute(user_id)
        );
        a.unwrap();
        b.unwrap();

        let stored = engine.store.require_maker_profile(user_id).await.unwrap();
        assert!(stored.platinum_override);
        assert_eq!(stored.maker_tier, MakerTier::Platinum);
    }
}
