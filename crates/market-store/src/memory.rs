use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::query::{page_bounds, paginate};
use crate::{
    ClaimId, ClaimQuery, ClaimRecord, LotId, LotQuery, LotRecord, LotStatus, MakerProfileRecord,
    Result, ReturnedProductRecord, StoreError, UserId, Version,
    store::{ClaimCommit, MarketStore, validate_commit},
};

#[derive(Default)]
struct Tables {
    lots: HashMap<LotId, LotRecord>,
    claims: HashMap<ClaimId, ClaimRecord>,
    profiles: HashMap<UserId, MakerProfileRecord>,
    returned_products: Vec<ReturnedProductRecord>,
}

/// In-memory market store.
///
/// All tables sit behind one `RwLock`, so each trait call is a serializable
/// transaction. The lock is never held across calls.
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    tables: Arc<RwLock<Tables>>,
    latency: Option<Duration>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency` before it touches the tables.
    ///
    /// Used to exercise caller deadlines.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn lot_count(&self) -> usize {
        self.tables.read().await.lots.len()
    }

    pub async fn claim_count(&self) -> usize {
        self.tables.read().await.claims.len()
    }

    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn check_version(
    entity: &'static str,
    id: impl ToString,
    expected: Version,
    actual: Version,
) -> Result<()> {
    if expected != actual {
        return Err(StoreError::ConcurrencyConflict {
            entity,
            id: id.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn insert_lot(&self, mut lot: LotRecord) -> Result<LotRecord> {
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;
        if tables.lots.contains_key(&lot.id) {
            return Err(StoreError::Duplicate {
                entity: "lot",
                id: lot.id.to_string(),
            });
        }
        lot.version = Version::first();
        tables.lots.insert(lot.id, lot.clone());
        Ok(lot)
    }

    async fn get_lot(&self, lot_id: LotId) -> Result<Option<LotRecord>> {
        self.simulate_latency().await;
        Ok(self.tables.read().await.lots.get(&lot_id).cloned())
    }

    async fn update_lot(&self, mut lot: LotRecord) -> Result<LotRecord> {
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;
        let stored = tables
            .lots
            .get_mut(&lot.id)
            .ok_or(StoreError::LotNotFound(lot.id))?;
        check_version("lot", lot.id, lot.version, stored.version)?;

        lot.version = stored.version.next();
        lot.updated_at = Utc::now();
        *stored = lot.clone();
        Ok(lot)
    }

    async fn delete_lot(&self, lot_id: LotId) -> Result<()> {
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;
        if !tables.lots.contains_key(&lot_id) {
            return Err(StoreError::LotNotFound(lot_id));
        }
        if tables.claims.values().any(|c| c.lot_id == lot_id) {
            return Err(StoreError::HasClaims(lot_id));
        }
        tables.lots.remove(&lot_id);
        Ok(())
    }

    async fn query_lots(&self, query: LotQuery) -> Result<Vec<LotRecord>> {
        page_bounds(query.offset, query.limit)?;
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        let mut lots: Vec<_> = tables
            .lots
            .values()
            .filter(|lot| query.matches(lot))
            .cloned()
            .collect();
        lots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(lots, query.offset, query.limit))
    }

    async fn claim_lot(&self, mut claim: ClaimRecord) -> Result<(LotRecord, ClaimRecord)> {
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;
        if tables.claims.contains_key(&claim.id) {
            return Err(StoreError::Duplicate {
                entity: "claim",
                id: claim.id.to_string(),
            });
        }

        let lot = tables
            .lots
            .get_mut(&claim.lot_id)
            .ok_or(StoreError::LotNotFound(claim.lot_id))?;
        if lot.status != LotStatus::Available {
            return Err(StoreError::StatusMismatch {
                lot_id: lot.id,
                expected: LotStatus::Available,
                actual: lot.status,
            });
        }
        let lot_id = lot.id;
        if !tables.profiles.contains_key(&claim.maker_id) {
            return Err(StoreError::MakerNotFound(claim.maker_id));
        }

        let Some(lot) = tables.lots.get_mut(&lot_id) else {
            return Err(StoreError::LotNotFound(lot_id));
        };
        lot.status = LotStatus::Claimed;
        lot.claimed_by = Some(claim.maker_id);
        lot.updated_at = claim.claimed_at;
        lot.version = lot.version.next();
        let lot = lot.clone();

        claim.version = Version::first();
        tables.claims.insert(claim.id, claim.clone());
        Ok((lot, claim))
    }

    async fn get_claim(&self, claim_id: ClaimId) -> Result<Option<ClaimRecord>> {
        self.simulate_latency().await;
        Ok(self.tables.read().await.claims.get(&claim_id).cloned())
    }

    async fn query_claims(&self, query: ClaimQuery) -> Result<Vec<ClaimRecord>> {
        page_bounds(query.offset, query.limit)?;
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        let mut claims: Vec<_> = tables
            .claims
            .values()
            .filter(|claim| query.matches(claim))
            .cloned()
            .collect();
        claims.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then(a.id.cmp(&b.id)));
        Ok(paginate(claims, query.offset, query.limit))
    }

    async fn commit_claim(&self, commit: ClaimCommit) -> Result<ClaimRecord> {
        validate_commit(&commit)?;
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;

        // Check every guard before touching any row.
        let stored_claim = tables
            .claims
            .get(&commit.claim.id)
            .ok_or(StoreError::ClaimNotFound(commit.claim.id))?;
        check_version(
            "claim",
            commit.claim.id,
            commit.expected_version,
            stored_claim.version,
        )?;

        if let Some(transition) = commit.lot_transition {
            let lot = tables
                .lots
                .get(&transition.lot_id)
                .ok_or(StoreError::LotNotFound(transition.lot_id))?;
            if lot.status != transition.from {
                return Err(StoreError::StatusMismatch {
                    lot_id: lot.id,
                    expected: transition.from,
                    actual: lot.status,
                });
            }
        }

        if let Some((profile, expected)) = &commit.profile {
            let stored = tables
                .profiles
                .get(&profile.user_id)
                .ok_or(StoreError::MakerNotFound(profile.user_id))?;
            check_version("maker profile", profile.user_id, *expected, stored.version)?;
        }

        let now = Utc::now();
        if let Some(transition) = commit.lot_transition
            && let Some(lot) = tables.lots.get_mut(&transition.lot_id)
        {
            lot.status = transition.to;
            lot.updated_at = now;
            lot.version = lot.version.next();
        }

        if let Some((mut profile, expected)) = commit.profile {
            profile.version = expected.next();
            profile.updated_at = now;
            tables.profiles.insert(profile.user_id, profile);
        }

        tables.returned_products.extend(commit.returned_products);

        let mut claim = commit.claim;
        claim.version = commit.expected_version.next();
        tables.claims.insert(claim.id, claim.clone());
        Ok(claim)
    }

    async fn insert_maker_profile(
        &self,
        mut profile: MakerProfileRecord,
    ) -> Result<MakerProfileRecord> {
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&profile.user_id) {
            return Err(StoreError::Duplicate {
                entity: "maker profile",
                id: profile.user_id.to_string(),
            });
        }
        profile.version = Version::first();
        tables.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn get_maker_profile(&self, user_id: UserId) -> Result<Option<MakerProfileRecord>> {
        self.simulate_latency().await;
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn update_maker_profile(
        &self,
        mut profile: MakerProfileRecord,
    ) -> Result<MakerProfileRecord> {
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;
        let stored = tables
            .profiles
            .get_mut(&profile.user_id)
            .ok_or(StoreError::MakerNotFound(profile.user_id))?;
        check_version(
            "maker profile",
            profile.user_id,
            profile.version,
            stored.version,
        )?;

        profile.version = stored.version.next();
        profile.updated_at = Utc::now();
        *stored = profile.clone();
        Ok(profile)
    }

    async fn list_maker_profiles(&self) -> Result<Vec<MakerProfileRecord>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        let mut profiles: Vec<_> = tables.profiles.values().cloned().collect();
        profiles.sort_by_key(|p| p.created_at);
        Ok(profiles)
    }

    async fn returned_products_for_claim(
        &self,
        claim_id: ClaimId,
    ) -> Result<Vec<ReturnedProductRecord>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        Ok(tables
            .returned_products
            .iter()
            .filter(|p| p.claim_id == claim_id)
            .cloned()
            .collect())
    }
}
