//! HTTP API server with observability for the lot marketplace.
//!
//! Provides REST endpoints for lot listing, claiming and the claim lifecycle,
//! maker profiles and reports, with structured logging (tracing) and
//! Prometheus metrics, including per-route request counts and latency.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{ClaimCoordinator, LotRepository, ReputationEngine};
use market_store::MarketStore;
use metrics_exporter_prometheus::PrometheusHandle;
use reporting::ReportingService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketStore> {
    pub lots: LotRepository<S>,
    pub claims: ClaimCoordinator<S>,
    pub reputation: ReputationEngine<S>,
    pub reports: ReportingService<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{claims, health, lots, makers, metrics, stats};

    let metrics_router = Router::new()
        .route("/metrics", get(metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health::check))
        .route("/lots", post(lots::create::<S>).get(lots::list::<S>))
        .route("/lots/categories", get(lots::categories))
        .route("/lots/recent", get(stats::recent_lots::<S>))
        .route("/lots/available", get(stats::available_lots::<S>))
        .route(
            "/lots/{id}",
            get(lots::get::<S>)
                .patch(lots::update::<S>)
                .delete(lots::delete::<S>),
        )
        .route(
            "/lots/{id}/claim",
            post(lots::claim::<S>).get(lots::current_claim::<S>),
        )
        .route("/lots/{id}/claims", get(lots::claims::<S>))
        .route("/claims/{id}", get(claims::get::<S>))
        .route(
            "/claims/{id}/schedule-pickup",
            post(claims::schedule_pickup::<S>),
        )
        .route("/claims/{id}/picked-up", post(claims::picked_up::<S>))
        .route(
            "/claims/{id}/schedule-return",
            post(claims::schedule_return::<S>),
        )
        .route("/claims/{id}/returned", post(claims::returned::<S>))
        .route("/claims/{id}/complete", post(claims::complete::<S>))
        .route("/claims/{id}/cancel", post(claims::cancel::<S>))
        .route(
            "/claims/{id}/returned-products",
            get(claims::returned_products::<S>),
        )
        .route("/makers", post(makers::register::<S>).get(makers::list::<S>))
        .route("/makers/leaderboard", get(stats::leaderboard::<S>))
        .route("/makers/{id}", get(makers::get::<S>))
        .route("/makers/{id}/contact", patch(makers::update_contact::<S>))
        .route("/makers/{id}/kyc", post(makers::verify_kyc::<S>))
        .route(
            "/makers/{id}/platinum",
            post(makers::promote::<S>).delete(makers::revoke::<S>),
        )
        .route("/makers/{id}/recompute", post(makers::recompute::<S>))
        .route("/makers/{id}/claims", get(stats::maker_history::<S>))
        .route("/stats", get(stats::platform::<S>))
        .route("/stats/stores", get(stats::stores::<S>))
        .route("/stats/stores/{id}", get(stats::store::<S>))
        .route("/activity", get(stats::activity::<S>))
        .route_layer(axum::middleware::from_fn(middleware::track_requests))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires every service over one store from the given configuration.
pub fn create_state<S: MarketStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let deadline = config.deadline();
    let reputation = ReputationEngine::new(store.clone(), config.reputation_policy(), deadline);

    Arc::new(AppState {
        lots: LotRepository::new(store.clone(), deadline),
        claims: ClaimCoordinator::new(
            store.clone(),
            reputation.clone(),
            config.coordinator_config(),
        ),
        reputation,
        reports: ReportingService::new(store, config.reporting_config(), deadline),
    })
}

/// Creates the application state with default settings.
pub fn create_default_state<S: MarketStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    create_state(store, &Config::default())
}
