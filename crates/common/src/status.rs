//! Lot lifecycle and maker tier enums.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a stored or client-supplied string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// The status of a lot.
///
/// Status only moves forward:
/// ```text
/// Available ──► Claimed ──► PickedUp ──► Returned ──► Completed
///                  │            │                        ▲
///                  └────────────┴──── (cancelled) ───────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    #[default]
    Available,
    Claimed,
    PickedUp,
    Returned,
    Completed,
}

impl LotStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [LotStatus; 5] = [
        LotStatus::Available,
        LotStatus::Claimed,
        LotStatus::PickedUp,
        LotStatus::Returned,
        LotStatus::Completed,
    ];

    /// Position in the forward order, starting at 0 for `Available`.
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Returns true if moving from `self` to `next` does not regress.
    pub fn can_advance_to(&self, next: LotStatus) -> bool {
        next.rank() > self.rank()
    }

    /// A lot carries a `claimed_by` maker in every status except `Available`.
    pub fn requires_claimant(&self) -> bool {
        !matches!(self, LotStatus::Available)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Available => "available",
            LotStatus::Claimed => "claimed",
            LotStatus::PickedUp => "picked_up",
            LotStatus::Returned => "returned",
            LotStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LotStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LotStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "lot status",
                value: s.to_string(),
            })
    }
}

/// Reputation band of a maker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MakerTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    /// Only reachable through a manual override.
    Platinum,
}

impl MakerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MakerTier::Bronze => "bronze",
            MakerTier::Silver => "silver",
            MakerTier::Gold => "gold",
            MakerTier::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for MakerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MakerTier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(MakerTier::Bronze),
            "silver" => Ok(MakerTier::Silver),
            "gold" => Ok(MakerTier::Gold),
            "platinum" => Ok(MakerTier::Platinum),
            other => Err(ParseEnumError {
                kind: "maker tier",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_available() {
        assert_eq!(LotStatus::default(), LotStatus::Available);
    }

    #[test]
    fn status_only_advances() {
        assert!(LotStatus::Available.can_advance_to(LotStatus::Claimed));
        assert!(LotStatus::Claimed.can_advance_to(LotStatus::Completed));
        assert!(!LotStatus::PickedUp.can_advance_to(LotStatus::Claimed));
        assert!(!LotStatus::Returned.can_advance_to(LotStatus::Returned));
    }

    #[test]
    fn only_available_has_no_claimant() {
        assert!(!LotStatus::Available.requires_claimant());
        for status in &LotStatus::ALL[1..] {
            assert!(status.requires_claimant());
        }
    }

    #[test]
    fn status_string_round_trip() {
        for status in LotStatus::ALL {
            assert_eq!(status.as_str().parse::<LotStatus>().unwrap(), status);
        }
        assert!("lost".parse::<LotStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&LotStatus::PickedUp).unwrap();
        assert_eq!(json, "\"picked_up\"");
        let tier: MakerTier = serde_json::from_str("\"gold\"").unwrap();
        assert_eq!(tier, MakerTier::Gold);
    }

    #[test]
    fn tier_parse_rejects_unknown() {
        let err = "diamond".parse::<MakerTier>().unwrap_err();
        assert_eq!(err.kind, "maker tier");
    }
}
