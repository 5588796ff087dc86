use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use market_store::{
    ClaimCommit, ClaimRecord, InMemoryMarketStore, LotQuery, LotRecord, LotStatus,
    MakerProfileRecord, MarketStore, StoreId, UserId,
};

fn make_lot(store_id: StoreId) -> LotRecord {
    LotRecord::new(store_id, UserId::new(), "Surplus apples", "Fresh Produce", 30)
}

fn bench_insert_lot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("market_store/insert_lot", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryMarketStore::new();
                store.insert_lot(make_lot(StoreId::new())).await.unwrap();
            });
        });
    });
}

fn bench_claim_lot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryMarketStore::new();
    let maker = UserId::new();
    rt.block_on(async {
        store
            .insert_maker_profile(MakerProfileRecord::new(maker, "Bench"))
            .await
            .unwrap();
    });

    c.bench_function("market_store/claim_lot", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lot = store.insert_lot(make_lot(StoreId::new())).await.unwrap();
                store
                    .claim_lot(ClaimRecord::open(lot.id, maker, Utc::now()))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_commit_pickup(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryMarketStore::new();
    let maker = UserId::new();
    rt.block_on(async {
        store
            .insert_maker_profile(MakerProfileRecord::new(maker, "Bench"))
            .await
            .unwrap();
    });

    c.bench_function("market_store/commit_pickup", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lot = store.insert_lot(make_lot(StoreId::new())).await.unwrap();
                let (_, mut claim) = store
                    .claim_lot(ClaimRecord::open(lot.id, maker, Utc::now()))
                    .await
                    .unwrap();
                claim.picked_up_at = Some(Utc::now());
                store
                    .commit_claim(
                        ClaimCommit::new(claim)
                            .advance_lot(LotStatus::Claimed, LotStatus::PickedUp),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_query_available(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryMarketStore::new();
    let store_id = StoreId::new();

    rt.block_on(async {
        for _ in 0..1000 {
            store.insert_lot(make_lot(store_id)).await.unwrap();
        }
    });

    c.bench_function("market_store/query_available_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .query_lots(LotQuery::new().status(LotStatus::Available).search("apple"))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_insert_lot,
    bench_claim_lot,
    bench_commit_pickup,
    bench_query_available
);
criterion_main!(benches);
