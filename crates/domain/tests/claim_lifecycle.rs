//! Integration tests for the claim lifecycle.
//!
//! These tests drive the coordinator, repository and reputation engine
//! together against the in-memory store, including concurrent callers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::{
    ClaimCoordinator, ClaimStage, CoordinatorConfig, Deadline, DomainError, ErrorKind,
    LotRepository, NewLot, NewMaker, ReputationEngine, ReputationPolicy, ReturnedItem,
};
use market_store::{
    InMemoryMarketStore, LotId, LotStatus, MakerTier, MarketStore, MarketStoreExt, StoreId, UserId,
};

struct Harness {
    store: InMemoryMarketStore,
    lots: LotRepository<InMemoryMarketStore>,
    claims: ClaimCoordinator<InMemoryMarketStore>,
}

fn harness_with(store: InMemoryMarketStore, config: CoordinatorConfig) -> Harness {
    let engine = ReputationEngine::new(store.clone(), ReputationPolicy::default(), config.deadline);
    Harness {
        lots: LotRepository::new(store.clone(), config.deadline),
        claims: ClaimCoordinator::new(store.clone(), engine, config),
        store,
    }
}

fn harness() -> Harness {
    harness_with(InMemoryMarketStore::new(), CoordinatorConfig::default())
}

impl Harness {
    async fn lot(&self) -> LotId {
        self.lots
            .create(NewLot::new(StoreId::new(), UserId::new(), "Surplus bananas", "Fresh Produce", 40).with_weight(9.0))
            .await
            .unwrap()
            .id
    }

    async fn maker(&self, name: &str) -> UserId {
        let user_id = UserId::new();
        self.lots
            .register_maker(NewMaker::new(user_id, name))
            .await
            .unwrap();
        user_id
    }
}

mod claiming {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_exactly_one_winner() {
        let h = Arc::new(harness());
        let lot_id = h.lot().await;

        let mut makers = Vec::new();
        for i in 0..16 {
            makers.push(h.maker(&format!("maker-{i}")).await);
        }

        let tasks = makers.into_iter().map(|maker| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.claims.claim_lot(lot_id, maker).await })
        });
        let results: Vec<_> = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        let already_claimed = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::AlreadyClaimed))
            .count();
        assert_eq!(already_claimed, 15);

        let lot = h.store.require_lot(lot_id).await.unwrap();
        assert_eq!(lot.status, LotStatus::Claimed);
        assert_eq!(lot.claimed_by, Some(winners[0].claim.maker_id));
        assert_eq!(h.claims.claims_for_lot(lot_id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn claims_on_different_lots_do_not_interfere() {
        let h = Arc::new(harness());
        let maker = h.maker("Solo").await;
        let mut lots = Vec::new();
        for _ in 0..8 {
            lots.push(h.lot().await);
        }

        let tasks = lots.into_iter().map(|lot_id| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.claims.claim_lot(lot_id, maker).await })
        });
        for joined in futures_util::future::join_all(tasks).await {
            assert!(joined.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn claimed_lot_cannot_be_edited_or_deleted() {
        let h = harness();
        let lot_id = h.lot().await;
        let maker = h.maker("Ada").await;
        h.claims.claim_lot(lot_id, maker).await.unwrap();

        let err = h
            .lots
            .update(
                lot_id,
                domain::LotPatch {
                    items_count: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let err = h.lots.delete(lot_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}

mod lifecycle {
    use super::*;

    /// Two makers race for one lot; the winner takes it all the way through.
    #[tokio::test]
    async fn race_then_full_lifecycle() {
        let h = harness();
        let lot_id = h.lot().await;
        let m1 = h.maker("M1").await;
        let m2 = h.maker("M2").await;

        let (r1, r2) = tokio::join!(h.claims.claim_lot(lot_id, m1), h.claims.claim_lot(lot_id, m2));
        let (winner, claim) = match (r1, r2) {
            (Ok(c), Err(e)) => {
                assert_eq!(e.kind(), ErrorKind::AlreadyClaimed);
                (m1, c.claim)
            }
            (Err(e), Ok(c)) => {
                assert_eq!(e.kind(), ErrorKind::AlreadyClaimed);
                (m2, c.claim)
            }
            other => panic!("expected exactly one winner, got {other:?}"),
        };
        assert_eq!(claim.maker_id, winner);

        let pickup_at = Utc::now() + chrono::Duration::hours(2);
        let claim = h.claims.schedule_pickup(claim.id, pickup_at).await.unwrap();
        assert_eq!(claim.pickup_scheduled_at, Some(pickup_at));
        assert_eq!(h.store.require_lot(lot_id).await.unwrap().status, LotStatus::Claimed);

        let claim = h.claims.mark_picked_up(claim.id).await.unwrap();
        assert_eq!(ClaimStage::of(&claim), ClaimStage::PickedUp);
        assert_eq!(h.store.require_lot(lot_id).await.unwrap().status, LotStatus::PickedUp);

        let return_at = Utc::now() + chrono::Duration::days(3);
        h.claims.schedule_return(claim.id, return_at).await.unwrap();

        let claim = h
            .claims
            .mark_returned(claim.id, Some("Made 12 jars of jam".into()))
            .await
            .unwrap();
        assert_eq!(claim.notes.as_deref(), Some("Made 12 jars of jam"));
        assert_eq!(h.store.require_lot(lot_id).await.unwrap().status, LotStatus::Returned);

        let profile = h.store.require_maker_profile(winner).await.unwrap();
        assert_eq!(profile.total_claims, 1);
        assert_eq!(profile.successful_returns, 1);
        assert_eq!(profile.rating, 5.0);
        assert_eq!(profile.maker_tier, MakerTier::Bronze);

        let claim = h
            .claims
            .complete_claim(
                claim.id,
                vec![ReturnedItem::new("Banana jam").with_value(6.5)],
            )
            .await
            .unwrap();
        assert_eq!(ClaimStage::of(&claim), ClaimStage::Completed);

        let lot = h.store.require_lot(lot_id).await.unwrap();
        assert_eq!(lot.status, LotStatus::Completed);
        assert_eq!(lot.claimed_by, Some(winner));

        let products = h.store.returned_products_for_claim(claim.id).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_name, "Banana jam");

        // Completing writes no further reputation.
        let profile = h.store.require_maker_profile(winner).await.unwrap();
        assert_eq!(profile.total_claims, 1);

        let loser = if winner == m1 { m2 } else { m1 };
        let profile = h.store.require_maker_profile(loser).await.unwrap();
        assert_eq!(profile.total_claims, 0);
    }

    #[tokio::test]
    async fn timestamps_fill_in_order() {
        let h = harness();
        let lot_id = h.lot().await;
        let maker = h.maker("Kai").await;
        let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;

        h.claims.mark_picked_up(claim.id).await.unwrap();
        let claim = h.claims.mark_returned(claim.id, None).await.unwrap();
        let claim = h.claims.complete_claim(claim.id, vec![]).await.unwrap();

        let picked = claim.picked_up_at.unwrap();
        let returned = claim.returned_at.unwrap();
        let completed = claim.completed_at.unwrap();
        assert!(claim.claimed_at <= picked);
        assert!(picked <= returned);
        assert!(returned <= completed);
    }

    #[tokio::test]
    async fn out_of_order_operations_are_invalid_state() {
        let h = harness();
        let lot_id = h.lot().await;
        let maker = h.maker("Noor").await;
        let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;

        let err = h.claims.mark_returned(claim.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let err = h.claims.schedule_return(claim.id, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let err = h.claims.complete_claim(claim.id, vec![]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // Nothing was written by the rejected calls.
        let stored = h.store.require_claim(claim.id).await.unwrap();
        assert_eq!(stored, claim);
    }

    #[tokio::test]
    async fn replayed_transitions_apply_once() {
        let h = harness();
        let lot_id = h.lot().await;
        let maker = h.maker("Rui").await;
        let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;

        h.claims.mark_picked_up(claim.id).await.unwrap();
        let err = h.claims.mark_picked_up(claim.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        h.claims.mark_returned(claim.id, None).await.unwrap();
        let err = h.claims.mark_returned(claim.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let profile = h.store.require_maker_profile(maker).await.unwrap();
        assert_eq!(profile.total_claims, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_pickups_apply_once() {
        let h = Arc::new(harness());
        let lot_id = h.lot().await;
        let maker = h.maker("Bo").await;
        let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;

        let tasks = (0..8).map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.claims.mark_picked_up(claim.id).await })
        });
        let results: Vec<_> = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| e.kind() == ErrorKind::InvalidState)
        );
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn cancel_closes_lot_and_records_failure() {
        let h = harness();
        let lot_id = h.lot().await;
        let maker = h.maker("Tess").await;
        let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;

        let cancelled = h
            .claims
            .cancel_claim(claim.id, Some("could not collect".into()))
            .await
            .unwrap();
        assert_eq!(ClaimStage::of(&cancelled), ClaimStage::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("could not collect"));

        let lot = h.store.require_lot(lot_id).await.unwrap();
        assert_eq!(lot.status, LotStatus::Completed);
        assert_eq!(lot.claimed_by, Some(maker));

        let profile = h.store.require_maker_profile(maker).await.unwrap();
        assert_eq!(profile.total_claims, 1);
        assert_eq!(profile.successful_returns, 0);
        assert_eq!(profile.rating, 0.0);

        let err = h.claims.cancel_claim(claim.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let profile = h.store.require_maker_profile(maker).await.unwrap();
        assert_eq!(profile.total_claims, 1);
    }

    #[tokio::test]
    async fn returned_claim_cannot_be_cancelled() {
        let h = harness();
        let lot_id = h.lot().await;
        let maker = h.maker("Ugo").await;
        let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;
        h.claims.mark_picked_up(claim.id).await.unwrap();
        h.claims.mark_returned(claim.id, None).await.unwrap();

        let err = h.claims.cancel_claim(claim.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}

mod reputation {
    use super::*;

    /// Terminal events on many lots for one maker, committed concurrently,
    /// must all be counted.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_terminal_events_lose_no_updates() {
        let h = Arc::new(harness());
        let maker = h.maker("Busy").await;

        let mut claims = Vec::new();
        for _ in 0..8 {
            let lot_id = h.lot().await;
            let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;
            h.claims.mark_picked_up(claim.id).await.unwrap();
            claims.push(claim.id);
        }

        let tasks = claims.into_iter().enumerate().map(|(i, claim_id)| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                if i % 4 == 0 {
                    h.claims.cancel_claim(claim_id, None).await
                } else {
                    h.claims.mark_returned(claim_id, None).await
                }
            })
        });
        for joined in futures_util::future::join_all(tasks).await {
            joined.unwrap().unwrap();
        }

        let profile = h.store.require_maker_profile(maker).await.unwrap();
        assert_eq!(profile.total_claims, 8);
        assert_eq!(profile.successful_returns, 6);
        assert_eq!(profile.rating, 3.75);
    }

    #[tokio::test]
    async fn ten_successful_claims_reach_silver() {
        let h = harness();
        let maker = h.maker("Steady").await;
        for _ in 0..10 {
            let lot_id = h.lot().await;
            let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;
            h.claims.mark_picked_up(claim.id).await.unwrap();
            h.claims.mark_returned(claim.id, None).await.unwrap();
        }

        let profile = h.store.require_maker_profile(maker).await.unwrap();
        assert_eq!(profile.maker_tier, MakerTier::Silver);
        assert!(profile.successful_returns <= profile.total_claims);
    }

    #[tokio::test]
    async fn platinum_override_is_kept_through_outcomes() {
        let h = harness();
        let maker = h.maker("Star").await;
        h.claims
            .reputation()
            .promote_to_platinum(maker)
            .await
            .unwrap();

        let lot_id = h.lot().await;
        let claim = h.claims.claim_lot(lot_id, maker).await.unwrap().claim;
        h.claims.cancel_claim(claim.id, None).await.unwrap();

        let profile = h.store.require_maker_profile(maker).await.unwrap();
        assert_eq!(profile.maker_tier, MakerTier::Platinum);
        assert_eq!(profile.total_claims, 1);
    }
}

mod deadlines {
    use super::*;

    #[tokio::test]
    async fn slow_store_times_out() {
        let store = InMemoryMarketStore::new();
        let maker = UserId::new();
        store
            .insert_maker_profile(market_store::MakerProfileRecord::new(maker, "Slow"))
            .await
            .unwrap();

        let slow = store.clone().with_latency(Duration::from_millis(200));
        let h = harness_with(
            slow,
            CoordinatorConfig {
                deadline: Deadline::from_millis(20),
                ..Default::default()
            },
        );

        let err = h.claims.claim_lot(LotId::new(), maker).await.unwrap_err();
        assert!(matches!(err, DomainError::Timeout { .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn kyc_gate_applies_when_configured() {
        let h = harness_with(
            InMemoryMarketStore::new(),
            CoordinatorConfig {
                require_kyc: true,
                ..Default::default()
            },
        );
        let lot_id = h.lot().await;
        let maker = h.maker("Unverified").await;

        let err = h.claims.claim_lot(lot_id, maker).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        h.lots.verify_kyc(maker).await.unwrap();
        assert!(h.claims.claim_lot(lot_id, maker).await.is_ok());
    }
}
