//! Lot listing, editing and claiming endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{KNOWN_CATEGORIES, LotClaim, LotPatch, NewLot};
use market_store::{
    ClaimRecord, LotId, LotQuery, LotRecord, LotStatus, MarketStore, StoreId, UserId,
};
use serde::Deserialize;

use super::{JsonBody, QueryParams, parse_id};
use crate::AppState;
use crate::error::ApiError;

/// Filters accepted by `GET /lots`.
#[derive(Debug, Default, Deserialize)]
pub struct LotParams {
    pub status: Option<String>,
    pub store_id: Option<StoreId>,
    pub created_by: Option<UserId>,
    pub claimed_by: Option<UserId>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LotParams {
    fn into_query(self) -> Result<LotQuery, ApiError> {
        let mut query = LotQuery::new();
        if let Some(raw) = self.status {
            let status = raw
                .parse::<LotStatus>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            query = query.status(status);
        }
        if let Some(id) = self.store_id {
            query = query.store(id);
        }
        if let Some(id) = self.created_by {
            query = query.created_by(id);
        }
        if let Some(id) = self.claimed_by {
            query = query.claimed_by(id);
        }
        if let Some(category) = self.category {
            query = query.category(category);
        }
        if let Some(term) = self.search.filter(|t| !t.trim().is_empty()) {
            query = query.search(term.trim());
        }
        if let Some(instant) = self.created_after {
            query = query.created_after(instant);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub maker_id: UserId,
}

/// POST /lots
#[tracing::instrument(skip(state, req), fields(store_id = %req.store_id))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<NewLot>,
) -> Result<(StatusCode, Json<LotRecord>), ApiError> {
    let lot = state.lots.create(req).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// GET /lots: every status, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    QueryParams(params): QueryParams<LotParams>,
) -> Result<Json<Vec<LotRecord>>, ApiError> {
    let lots = state.lots.query(params.into_query()?).await?;
    Ok(Json(lots))
}

#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<LotRecord>, ApiError> {
    let lot_id: LotId = parse_id(&id, "lot")?;
    Ok(Json(state.lots.get(lot_id).await?))
}

/// PATCH /lots/{id}: only while the lot is still available.
#[tracing::instrument(skip(state, patch))]
pub async fn update<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<LotPatch>,
) -> Result<Json<LotRecord>, ApiError> {
    let lot_id: LotId = parse_id(&id, "lot")?;
    Ok(Json(state.lots.update(lot_id, patch).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let lot_id: LotId = parse_id(&id, "lot")?;
    state.lots.delete(lot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /lots/{id}/claim: at most one caller wins; the rest get 409
/// `already_claimed`.
#[tracing::instrument(skip(state, req), fields(maker_id = %req.maker_id))]
pub async fn claim<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ClaimRequest>,
) -> Result<(StatusCode, Json<LotClaim>), ApiError> {
    let lot_id: LotId = parse_id(&id, "lot")?;
    let claimed = state.claims.claim_lot(lot_id, req.maker_id).await?;
    Ok((StatusCode::CREATED, Json(claimed)))
}

/// GET /lots/{id}/claim: the claim holding the lot, whatever its stage.
#[tracing::instrument(skip(state))]
pub async fn current_claim<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ClaimRecord>, ApiError> {
    let lot_id: LotId = parse_id(&id, "lot")?;
    Ok(Json(state.claims.current_claim(lot_id).await?))
}

/// GET /lots/categories
pub async fn categories() -> Json<&'static [&'static str]> {
    let categories: &'static [&'static str] = &KNOWN_CATEGORIES;
    Json(categories)
}

#[tracing::instrument(skip(state))]
pub async fn claims<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ClaimRecord>>, ApiError> {
    let lot_id: LotId = parse_id(&id, "lot")?;
    Ok(Json(state.claims.claims_for_lot(lot_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_bad_request() {
        let params = LotParams {
            status: Some("lost".to_string()),
            ..LotParams::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn params_map_onto_query() {
        let store_id = StoreId::new();
        let query = LotParams {
            status: Some("available".to_string()),
            store_id: Some(store_id),
            search: Some("  bread ".to_string()),
            limit: Some(3),
            ..LotParams::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.status, Some(LotStatus::Available));
        assert_eq!(query.store_id, Some(store_id));
        assert_eq!(query.search.as_deref(), Some("bread"));
        assert_eq!(query.limit, Some(3));
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = LotParams {
            search: Some("   ".to_string()),
            ..LotParams::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.search, None);
    }
}
