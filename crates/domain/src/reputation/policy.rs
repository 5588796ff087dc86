use market_store::{MakerProfileRecord, MakerTier};
use serde::{Deserialize, Serialize};

/// Terminal outcome of a claim as seen by the reputation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// The maker picked up and returned the lot.
    Success,
    /// The claim was cancelled before a return.
    Failure,
}

impl ClaimOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Success => "success",
            ClaimOutcome::Failure => "failure",
        }
    }
}

/// Thresholds and weights for rating and tier derivation.
///
/// Rating is a smoothed success ratio:
///
/// ```text
/// rating = clamp((prior_rating * prior_weight + max_rating * successes)
///                / (prior_weight + total), 0, max_rating)
/// ```
///
/// With the default zero prior this is `5 * successes / total`, and a maker
/// with no claims is rated 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationPolicy {
    pub silver_min_claims: u64,
    pub gold_min_claims: u64,
    pub gold_min_rating: f64,
    pub prior_weight: f64,
    pub prior_rating: f64,
    pub max_rating: f64,
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self {
            silver_min_claims: 10,
            gold_min_claims: 50,
            gold_min_rating: 4.5,
            prior_weight: 0.0,
            prior_rating: 0.0,
            max_rating: 5.0,
        }
    }
}

impl ReputationPolicy {
    pub fn rating(&self, total_claims: u64, successful_returns: u64) -> f64 {
        let denominator = self.prior_weight + total_claims as f64;
        if denominator <= 0.0 {
            return 0.0;
        }
        let numerator =
            self.prior_rating * self.prior_weight + self.max_rating * successful_returns as f64;
        (numerator / denominator).clamp(0.0, self.max_rating)
    }

    /// Pure tier derivation. The manual override always wins.
    pub fn tier_for(&self, total_claims: u64, rating: f64, platinum_override: bool) -> MakerTier {
        if platinum_override {
            MakerTier::Platinum
        } else if total_claims >= self.gold_min_claims && rating >= self.gold_min_rating {
            MakerTier::Gold
        } else if total_claims >= self.silver_min_claims {
            MakerTier::Silver
        } else {
            MakerTier::Bronze
        }
    }

    /// Re-derives rating and tier from the profile's counters.
    pub fn rederive(&self, mut profile: MakerProfileRecord) -> MakerProfileRecord {
        profile.rating = self.rating(profile.total_claims, profile.successful_returns);
        profile.maker_tier =
            self.tier_for(profile.total_claims, profile.rating, profile.platinum_override);
        profile
    }

    /// Folds one terminal outcome into the profile.
    ///
    /// The returned record keeps the version it was read at, so it can be
    /// written with a version guard.
    pub fn apply_outcome(
        &self,
        mut profile: MakerProfileRecord,
        outcome: ClaimOutcome,
    ) -> MakerProfileRecord {
        profile.total_claims += 1;
        if outcome == ClaimOutcome::Success {
            profile.successful_returns += 1;
        }
        self.rederive(profile)
    }
}
