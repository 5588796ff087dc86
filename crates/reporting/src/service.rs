use std::collections::{HashMap, HashSet};

use domain::{ClaimStage, Deadline};
use market_store::{
    ClaimQuery, ClaimRecord, LotId, LotQuery, LotRecord, LotStatus, MakerProfileRecord,
    MarketStore, StoreId, UserId,
};
use serde::{Deserialize, Serialize};

use crate::error::{ReportingError, Result};
use crate::views::{
    ActivityEntry, ClaimHistoryEntry, LeaderboardEntry, MakerHistory, PlatformStats, StoreStats,
};

/// Factors and default limits for reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Estimated kilograms of waste diverted per listed lot.
    pub waste_factor_kg: f64,
    /// Kilograms of CO2 saved per kilogram of waste diverted.
    pub co2_factor: f64,
    pub recent_activity_limit: usize,
    pub recent_lots_limit: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            waste_factor_kg: 2.5,
            co2_factor: 2.1,
            recent_activity_limit: 10,
            recent_lots_limit: 5,
        }
    }
}

impl ReportingConfig {
    /// Whole kilograms diverted for `lots` listed lots.
    pub fn waste_diverted_kg(&self, lots: u64) -> f64 {
        (lots as f64 * self.waste_factor_kg).round()
    }

    pub fn co2_saved_kg(&self, waste_kg: f64) -> f64 {
        (waste_kg * self.co2_factor).round()
    }
}

/// Read-only reports computed from store scans.
///
/// Nothing is cached. Every call reads the current rows, one store read at a
/// time.
#[derive(Clone)]
pub struct ReportingService<S: MarketStore> {
    store: S,
    config: ReportingConfig,
    deadline: Deadline,
}

impl<S: MarketStore> ReportingService<S> {
    pub fn new(store: S, config: ReportingConfig, deadline: Deadline) -> Self {
        Self {
            store,
            config,
            deadline,
        }
    }

    pub fn config(&self) -> &ReportingConfig {
        &self.config
    }

    #[tracing::instrument(skip(self))]
    pub async fn platform_stats(&self) -> Result<PlatformStats> {
        let lots = self.lots(LotQuery::new()).await?;
        let claims = self.claims(ClaimQuery::new()).await?;
        let makers = self.makers().await?;

        let total_lots = lots.len() as u64;
        let available_lots = lots.iter().filter(|lot| lot.is_available()).count() as u64;
        let active_makers = claims
            .iter()
            .map(|claim| claim.maker_id)
            .collect::<HashSet<_>>()
            .len() as u64;
        let active_stores = lots
            .iter()
            .map(|lot| lot.store_id)
            .collect::<HashSet<_>>()
            .len() as u64;
        let average_rating = if makers.is_empty() {
            0.0
        } else {
            makers.iter().map(|m| m.rating).sum::<f64>() / makers.len() as f64
        };
        let waste_diverted_kg = self.config.waste_diverted_kg(total_lots);

        metrics::counter!("reports_generated_total", "report" => "platform_stats").increment(1);
        Ok(PlatformStats {
            total_lots,
            available_lots,
            total_claims: claims.len() as u64,
            registered_makers: makers.len() as u64,
            active_makers,
            active_stores,
            average_rating,
            claim_rate: claims.len() as f64 / total_lots.max(1) as f64,
            waste_diverted_kg,
            co2_saved_kg: self.config.co2_saved_kg(waste_diverted_kg),
        })
    }

    /// Lot totals for one store, or across all stores when `store_id` is
    /// `None`.
    #[tracing::instrument(skip(self))]
    pub async fn store_stats(&self, store_id: Option<StoreId>) -> Result<StoreStats> {
        let query = match store_id {
            Some(id) => LotQuery::new().store(id),
            None => LotQuery::new(),
        };
        let lots = self.lots(query).await?;
        let total_lots = lots.len() as u64;
        let count = |status: LotStatus| lots.iter().filter(|lot| lot.status == status).count() as u64;

        Ok(StoreStats {
            store_id,
            total_lots,
            available_lots: count(LotStatus::Available),
            claimed_lots: count(LotStatus::Claimed),
            waste_diverted_kg: self.config.waste_diverted_kg(total_lots),
        })
    }

    /// Per-store totals for every store that has listed a lot.
    pub async fn all_store_stats(&self) -> Result<Vec<StoreStats>> {
        let lots = self.lots(LotQuery::new()).await?;
        let mut per_store: HashMap<StoreId, (u64, u64, u64)> = HashMap::new();
        for lot in &lots {
            let entry = per_store.entry(lot.store_id).or_default();
            entry.0 += 1;
            match lot.status {
                LotStatus::Available => entry.1 += 1,
                LotStatus::Claimed => entry.2 += 1,
                _ => {}
            }
        }

        let mut stats: Vec<_> = per_store
            .into_iter()
            .map(|(store_id, (total, available, claimed))| StoreStats {
                store_id: Some(store_id),
                total_lots: total,
                available_lots: available,
                claimed_lots: claimed,
                waste_diverted_kg: self.config.waste_diverted_kg(total),
            })
            .collect();
        stats.sort_by(|a, b| b.total_lots.cmp(&a.total_lots).then(a.store_id.cmp(&b.store_id)));
        Ok(stats)
    }

    /// Available lots, newest first, optionally filtered by a
    /// case-insensitive term over title and category.
    #[tracing::instrument(skip(self))]
    pub async fn available_lots(&self, search: Option<&str>) -> Result<Vec<LotRecord>> {
        let mut query = LotQuery::new().status(LotStatus::Available);
        if let Some(term) = search.map(str::trim)
            && !term.is_empty()
        {
            query = query.search(term);
        }
        self.lots(query).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn maker_history(&self, maker_id: UserId) -> Result<MakerHistory> {
        let profile = self
            .deadline
            .run("get_maker_profile", self.store.get_maker_profile(maker_id))
            .await?
            .ok_or(ReportingError::MakerNotFound(maker_id))?;
        let claims = self.claims(ClaimQuery::for_maker(maker_id)).await?;
        let lots = self.lots_by_id(LotQuery::new().claimed_by(maker_id)).await?;

        let claims = claims
            .into_iter()
            .map(|claim| {
                let lot = lots.get(&claim.lot_id);
                ClaimHistoryEntry {
                    stage: ClaimStage::of(&claim),
                    lot_title: lot.map(|l| l.title.clone()),
                    lot_category: lot.map(|l| l.category.clone()),
                    store_id: lot.map(|l| l.store_id),
                    claim,
                }
            })
            .collect();

        Ok(MakerHistory { profile, claims })
    }

    /// Makers ordered by rating, highest first. Ties go to the maker with
    /// more claims.
    #[tracing::instrument(skip(self))]
    pub async fn maker_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut makers = self.makers().await?;
        makers.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then(b.total_claims.cmp(&a.total_claims))
                .then(a.user_id.cmp(&b.user_id))
        });
        Ok(makers.iter().take(limit).map(LeaderboardEntry::from).collect())
    }

    /// Latest claims with lot and maker names. `None` uses the configured
    /// default limit.
    #[tracing::instrument(skip(self))]
    pub async fn recent_activity(&self, limit: Option<usize>) -> Result<Vec<ActivityEntry>> {
        let limit = limit.unwrap_or(self.config.recent_activity_limit);
        let claims = self.claims(ClaimQuery::new().limit(limit)).await?;
        if claims.is_empty() {
            return Ok(Vec::new());
        }

        let lots = self.lots_by_id(LotQuery::new()).await?;
        let names: HashMap<UserId, String> = self
            .makers()
            .await?
            .into_iter()
            .map(|m| (m.user_id, m.full_name))
            .collect();

        Ok(claims
            .into_iter()
            .map(|claim| {
                let lot = lots.get(&claim.lot_id);
                ActivityEntry {
                    claim_id: claim.id,
                    lot_id: claim.lot_id,
                    lot_title: lot.map(|l| l.title.clone()),
                    lot_category: lot.map(|l| l.category.clone()),
                    maker_id: claim.maker_id,
                    maker_name: names.get(&claim.maker_id).cloned(),
                    stage: ClaimStage::of(&claim),
                    claimed_at: claim.claimed_at,
                }
            })
            .collect())
    }

    /// Newest lots in any status, optionally for one store.
    #[tracing::instrument(skip(self))]
    pub async fn recent_lots(
        &self,
        store_id: Option<StoreId>,
        limit: Option<usize>,
    ) -> Result<Vec<LotRecord>> {
        let mut query = LotQuery::new().limit(limit.unwrap_or(self.config.recent_lots_limit));
        if let Some(id) = store_id {
            query = query.store(id);
        }
        self.lots(query).await
    }

    async fn lots(&self, query: LotQuery) -> Result<Vec<LotRecord>> {
        Ok(self
            .deadline
            .run("query_lots", self.store.query_lots(query))
            .await?)
    }

    async fn lots_by_id(&self, query: LotQuery) -> Result<HashMap<LotId, LotRecord>> {
        Ok(self
            .lots(query)
            .await?
            .into_iter()
            .map(|lot| (lot.id, lot))
            .collect())
    }

    async fn claims(&self, query: ClaimQuery) -> Result<Vec<ClaimRecord>> {
        Ok(self
            .deadline
            .run("query_claims", self.store.query_claims(query))
            .await?)
    }

    async fn makers(&self) -> Result<Vec<MakerProfileRecord>> {
        Ok(self
            .deadline
            .run("list_maker_profiles", self.store.list_maker_profiles())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waste_and_co2_are_rounded_to_whole_kg() {
        let config = ReportingConfig::default();
        assert_eq!(config.waste_diverted_kg(3), 8.0);
        assert_eq!(config.waste_diverted_kg(4), 10.0);
        assert_eq!(config.co2_saved_kg(10.0), 21.0);
        assert_eq!(config.co2_saved_kg(8.0), 17.0);
    }

    #[test]
    fn no_lots_means_no_waste() {
        let config = ReportingConfig::default();
        assert_eq!(config.waste_diverted_kg(0), 0.0);
    }
}
