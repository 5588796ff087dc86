//! Report endpoints backed by [`reporting::ReportingService`].

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use market_store::{LotRecord, MarketStore, StoreId, UserId};
use reporting::{ActivityEntry, LeaderboardEntry, MakerHistory, PlatformStats, StoreStats};
use serde::Deserialize;

use super::{QueryParams, parse_id};
use crate::AppState;
use crate::error::ApiError;

const DEFAULT_LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentLotsParams {
    pub store_id: Option<StoreId>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

/// GET /stats
#[tracing::instrument(skip(state))]
pub async fn platform<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<PlatformStats>, ApiError> {
    Ok(Json(state.reports.platform_stats().await?))
}

/// GET /stats/stores: one entry per store, busiest first.
#[tracing::instrument(skip(state))]
pub async fn stores<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<StoreStats>>, ApiError> {
    Ok(Json(state.reports.all_store_stats().await?))
}

#[tracing::instrument(skip(state))]
pub async fn store<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<StoreStats>, ApiError> {
    let store_id: StoreId = parse_id(&id, "store")?;
    Ok(Json(state.reports.store_stats(Some(store_id)).await?))
}

/// GET /lots/available?search=
#[tracing::instrument(skip(state))]
pub async fn available_lots<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    QueryParams(params): QueryParams<SearchParams>,
) -> Result<Json<Vec<LotRecord>>, ApiError> {
    Ok(Json(
        state.reports.available_lots(params.search.as_deref()).await?,
    ))
}

/// GET /lots/recent?store_id=&limit=
#[tracing::instrument(skip(state))]
pub async fn recent_lots<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    QueryParams(params): QueryParams<RecentLotsParams>,
) -> Result<Json<Vec<LotRecord>>, ApiError> {
    Ok(Json(
        state
            .reports
            .recent_lots(params.store_id, params.limit)
            .await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn maker_history<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MakerHistory>, ApiError> {
    let user_id: UserId = parse_id(&id, "maker")?;
    Ok(Json(state.reports.maker_history(user_id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn leaderboard<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    QueryParams(params): QueryParams<LimitParams>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_SIZE);
    Ok(Json(state.reports.maker_leaderboard(limit).await?))
}

/// GET /activity?limit=
#[tracing::instrument(skip(state))]
pub async fn activity<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    QueryParams(params): QueryParams<LimitParams>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    Ok(Json(state.reports.recent_activity(params.limit).await?))
}
