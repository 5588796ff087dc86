//! Claim lifecycle endpoints.
//!
//! Each step is a `POST` on the claim. Calling a step out of order, or
//! replaying one, answers 409 `invalid_state`.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use domain::ReturnedItem;
use market_store::{ClaimId, ClaimRecord, MarketStore, ReturnedProductRecord};
use serde::Deserialize;

use super::{JsonBody, optional_json, parse_id};
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub items: Vec<ReturnedItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ClaimRecord>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    Ok(Json(state.claims.get_claim(claim_id).await?))
}

#[tracing::instrument(skip(state, req), fields(at = %req.at))]
pub async fn schedule_pickup<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ScheduleRequest>,
) -> Result<Json<ClaimRecord>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    Ok(Json(state.claims.schedule_pickup(claim_id, req.at).await?))
}

#[tracing::instrument(skip(state))]
pub async fn picked_up<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ClaimRecord>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    Ok(Json(state.claims.mark_picked_up(claim_id).await?))
}

#[tracing::instrument(skip(state, req), fields(at = %req.at))]
pub async fn schedule_return<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ScheduleRequest>,
) -> Result<Json<ClaimRecord>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    Ok(Json(state.claims.schedule_return(claim_id, req.at).await?))
}

/// POST /claims/{id}/returned: body `{"notes": ...}` is optional.
#[tracing::instrument(skip(state, body))]
pub async fn returned<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ClaimRecord>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    let req: ReturnRequest = optional_json(&body)?;
    Ok(Json(state.claims.mark_returned(claim_id, req.notes).await?))
}

/// POST /claims/{id}/complete: body `{"items": [...]}` is optional.
#[tracing::instrument(skip(state, body))]
pub async fn complete<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ClaimRecord>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    let req: CompleteRequest = optional_json(&body)?;
    Ok(Json(state.claims.complete_claim(claim_id, req.items).await?))
}

#[tracing::instrument(skip(state, body))]
pub async fn cancel<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ClaimRecord>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    let req: CancelRequest = optional_json(&body)?;
    Ok(Json(state.claims.cancel_claim(claim_id, req.reason).await?))
}

/// Items recorded when the claim was completed.
#[tracing::instrument(skip(state))]
pub async fn returned_products<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReturnedProductRecord>>, ApiError> {
    let claim_id: ClaimId = parse_id(&id, "claim")?;
    let claim = state.claims.get_claim(claim_id).await?;
    Ok(Json(state.claims.returned_products(claim.id).await?))
}
