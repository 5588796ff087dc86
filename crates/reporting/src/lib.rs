//! Read-only reports over the lot marketplace.
//!
//! [`ReportingService`] scans the store on every call and assembles:
//! - platform and per-store totals, including estimated waste diverted
//! - the available-lot listing with free-text search
//! - per-maker claim history and the rating leaderboard
//! - recent claim activity and recently listed lots

pub mod error;
pub mod service;
pub mod views;

pub use error::{ReportingError, Result};
pub use service::{ReportingConfig, ReportingService};
pub use views::{
    ActivityEntry, ClaimHistoryEntry, LeaderboardEntry, MakerHistory, PlatformStats, StoreStats,
};
