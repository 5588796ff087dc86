//! Maker profile and tier override endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{ContactUpdate, NewMaker};
use market_store::{MakerProfileRecord, MarketStore, UserId};

use super::{JsonBody, parse_id};
use crate::AppState;
use crate::error::ApiError;

/// POST /makers: creates a bronze profile with no claims.
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id))]
pub async fn register<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<NewMaker>,
) -> Result<(StatusCode, Json<MakerProfileRecord>), ApiError> {
    let profile = state.lots.register_maker(req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[tracing::instrument(skip(state))]
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<MakerProfileRecord>>, ApiError> {
    Ok(Json(state.lots.list_makers().await?))
}

#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MakerProfileRecord>, ApiError> {
    let user_id: UserId = parse_id(&id, "maker")?;
    Ok(Json(state.lots.get_maker(user_id).await?))
}

#[tracing::instrument(skip(state, req))]
pub async fn update_contact<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ContactUpdate>,
) -> Result<Json<MakerProfileRecord>, ApiError> {
    let user_id: UserId = parse_id(&id, "maker")?;
    Ok(Json(state.lots.update_contact(user_id, req).await?))
}

#[tracing::instrument(skip(state))]
pub async fn verify_kyc<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MakerProfileRecord>, ApiError> {
    let user_id: UserId = parse_id(&id, "maker")?;
    Ok(Json(state.lots.verify_kyc(user_id).await?))
}

/// POST /makers/{id}/platinum
#[tracing::instrument(skip(state))]
pub async fn promote<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MakerProfileRecord>, ApiError> {
    let user_id: UserId = parse_id(&id, "maker")?;
    Ok(Json(state.reputation.promote_to_platinum(user_id).await?))
}

/// DELETE /makers/{id}/platinum: the tier falls back to the derived one.
#[tracing::instrument(skip(state))]
pub async fn revoke<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MakerProfileRecord>, ApiError> {
    let user_id: UserId = parse_id(&id, "maker")?;
    Ok(Json(state.reputation.revoke_platinum(user_id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn recompute<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MakerProfileRecord>, ApiError> {
    let user_id: UserId = parse_id(&id, "maker")?;
    Ok(Json(state.reputation.recompute(user_id).await?))
}
