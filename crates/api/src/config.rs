//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::{CoordinatorConfig, Deadline, ReputationPolicy};
use reporting::ReportingConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs in memory
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 5)
/// - `STORE_TIMEOUT_MS`: deadline for every store call (default 2000)
/// - `REQUIRE_KYC`: reject claims from unverified makers (default false)
/// - `SILVER_MIN_CLAIMS`, `GOLD_MIN_CLAIMS`, `GOLD_MIN_RATING`: tier thresholds
/// - `RATING_PRIOR_WEIGHT`, `RATING_PRIOR`: rating smoothing
/// - `WASTE_FACTOR_KG`, `CO2_FACTOR`: impact report factors
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store_timeout_ms: u64,
    pub require_kyc: bool,
    pub silver_min_claims: u64,
    pub gold_min_claims: u64,
    pub gold_min_rating: f64,
    pub rating_prior_weight: f64,
    pub rating_prior: f64,
    pub waste_factor_kg: f64,
    pub co2_factor: f64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            store_timeout_ms: parse_or(&lookup, "STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            require_kyc: lookup("REQUIRE_KYC")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.require_kyc),
            silver_min_claims: parse_or(&lookup, "SILVER_MIN_CLAIMS", defaults.silver_min_claims),
            gold_min_claims: parse_or(&lookup, "GOLD_MIN_CLAIMS", defaults.gold_min_claims),
            gold_min_rating: parse_or(&lookup, "GOLD_MIN_RATING", defaults.gold_min_rating),
            rating_prior_weight: parse_or(
                &lookup,
                "RATING_PRIOR_WEIGHT",
                defaults.rating_prior_weight,
            ),
            rating_prior: parse_or(&lookup, "RATING_PRIOR", defaults.rating_prior),
            waste_factor_kg: parse_or(&lookup, "WASTE_FACTOR_KG", defaults.waste_factor_kg),
            co2_factor: parse_or(&lookup, "CO2_FACTOR", defaults.co2_factor),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn deadline(&self) -> Deadline {
        Deadline::from_millis(self.store_timeout_ms)
    }

    pub fn reputation_policy(&self) -> ReputationPolicy {
        ReputationPolicy {
            silver_min_claims: self.silver_min_claims,
            gold_min_claims: self.gold_min_claims,
            gold_min_rating: self.gold_min_rating,
            prior_weight: self.rating_prior_weight,
            prior_rating: self.rating_prior,
            ..ReputationPolicy::default()
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            deadline: self.deadline(),
            require_kyc: self.require_kyc,
            ..CoordinatorConfig::default()
        }
    }

    pub fn reporting_config(&self) -> ReportingConfig {
        ReportingConfig {
            waste_factor_kg: self.waste_factor_kg,
            co2_factor: self.co2_factor,
            ..ReportingConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let policy = ReputationPolicy::default();
        let reporting = ReportingConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 5,
            store_timeout_ms: domain::DEFAULT_STORE_TIMEOUT.as_millis() as u64,
            require_kyc: false,
            silver_min_claims: policy.silver_min_claims,
            gold_min_claims: policy.gold_min_claims,
            gold_min_rating: policy.gold_min_rating,
            rating_prior_weight: policy.prior_weight,
            rating_prior: policy.prior_rating,
            waste_factor_kg: reporting.waste_factor_kg,
            co2_factor: reporting.co2_factor,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
