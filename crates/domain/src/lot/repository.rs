use chrono::{DateTime, Utc};
use market_store::{
    LotId, LotQuery, LotRecord, LotStatus, MakerProfileRecord, MarketStore, MarketStoreExt,
    StoreError, StoreId, UserId,
};

use crate::deadline::Deadline;
use crate::error::DomainError;
use crate::profile::{MAX_WRITE_ATTEMPTS, modify_profile};

use super::commands::{ContactUpdate, LotPatch, NewLot, NewMaker};
use super::validation::require_text;

/// Validated CRUD over lots and maker onboarding data.
///
/// Nothing here changes a lot's status or a maker's derived reputation; those
/// belong to the claim coordinator and the reputation engine.
#[derive(Clone)]
pub struct LotRepository<S: MarketStore> {
    store: S,
    deadline: Deadline,
}

impl<S: MarketStore> LotRepository<S> {
    pub fn new(store: S, deadline: Deadline) -> Self {
        Self { store, deadline }
    }

    #[tracing::instrument(skip(self), fields(store_id = %new_lot.store_id))]
    pub async fn create(&self, new_lot: NewLot) -> Result<LotRecord, DomainError> {
        new_lot.validate()?;
        let lot = self
            .deadline
            .run("insert_lot", self.store.insert_lot(new_lot.into_record()))
            .await?;
        metrics::counter!("lots_created_total").increment(1);
        tracing::info!(lot_id = %lot.id, category = %lot.category, "lot listed");
        Ok(lot)
    }

    pub async fn get(&self, lot_id: LotId) -> Result<LotRecord, DomainError> {
        self.deadline
            .run("get_lot", self.store.require_lot(lot_id))
            .await
    }

    /// Applies a patch to an available lot.
    ///
    /// Without `expected_version` a lost race is reloaded and the patch is
    /// re-applied, so a lot claimed in between fails with `InvalidState`.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, lot_id: LotId, patch: LotPatch) -> Result<LotRecord, DomainError> {
        let mut attempt = 1;
        loop {
            let current = self.get(lot_id).await?;
            if !current.is_available() {
                return Err(DomainError::invalid_state(
                    "update lot",
                    format!("lot is {}", current.status),
                ));
            }
            if let Some(expected) = patch.expected_version
                && expected != current.version
            {
                return Err(DomainError::Conflict(format!(
                    "lot {lot_id} is at version {}, not {expected}",
                    current.version
                )));
            }

            let next = patch.apply(current)?;
            match self
                .deadline
                .within("update_lot", self.store.update_lot(next))
                .await?
            {
                Ok(stored) => {
                    tracing::info!(%lot_id, version = %stored.version, "lot updated");
                    return Ok(stored);
                }
                Err(StoreError::ConcurrencyConflict { .. })
                    if patch.expected_version.is_none() && attempt < MAX_WRITE_ATTEMPTS =>
                {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Removes a lot that has never been claimed.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, lot_id: LotId) -> Result<(), DomainError> {
        self.deadline
            .run("delete_lot", self.store.delete_lot(lot_id))
            .await?;
        tracing::info!(%lot_id, "lot deleted");
        Ok(())
    }

    pub async fn query(&self, query: LotQuery) -> Result<Vec<LotRecord>, DomainError> {
        self.deadline
            .run("query_lots", self.store.query_lots(query))
            .await
    }

    pub async fn by_status(&self, status: LotStatus) -> Result<Vec<LotRecord>, DomainError> {
        self.query(LotQuery::new().status(status)).await
    }

    pub async fn by_store(&self, store_id: StoreId) -> Result<Vec<LotRecord>, DomainError> {
        self.query(LotQuery::new().store(store_id)).await
    }

    pub async fn created_after(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Vec<LotRecord>, DomainError> {
        self.query(LotQuery::new().created_after(instant)).await
    }

    // Maker onboarding

    #[tracing::instrument(skip(self), fields(user_id = %maker.user_id))]
    pub async fn register_maker(&self, maker: NewMaker) -> Result<MakerProfileRecord, DomainError> {
        require_text("full_name", &maker.full_name)?;
        let mut profile = MakerProfileRecord::new(maker.user_id, maker.full_name.trim());
        profile.phone = maker.phone;
        profile.address = maker.address;

        let profile = self
            .deadline
            .run("insert_maker_profile", self.store.insert_maker_profile(profile))
            .await?;
        tracing::info!(user_id = %profile.user_id, "maker registered");
        Ok(profile)
    }

    pub async fn get_maker(&self, user_id: UserId) -> Result<MakerProfileRecord, DomainError> {
        self.deadline
            .run("get_maker_profile", self.store.require_maker_profile(user_id))
            .await
    }

    pub async fn list_makers(&self) -> Result<Vec<MakerProfileRecord>, DomainError> {
        self.deadline
            .run("list_maker_profiles", self.store.list_maker_profiles())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_contact(
        &self,
        user_id: UserId,
        update: ContactUpdate,
    ) -> Result<MakerProfileRecord, DomainError> {
        if let Some(ref name) = update.full_name {
            require_text("full_name", name)?;
        }
        modify_profile(&self.store, &self.deadline, user_id, |mut profile| {
            if let Some(ref name) = update.full_name {
                profile.full_name = name.trim().to_string();
            }
            if update.phone.is_some() {
                profile.phone = update.phone.clone();
            }
            if update.address.is_some() {
                profile.address = update.address.clone();
            }
            Ok(profile)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn verify_kyc(&self, user_id: UserId) -> Result<MakerProfileRecord, DomainError> {
        let profile = modify_profile(&self.store, &self.deadline, user_id, |mut profile| {
            profile.kyc_verified = true;
            Ok(profile)
        })
        .await?;
        tracing::info!(%user_id, "maker KYC verified");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use market_store::InMemoryMarketStore;

    use super::*;
    use crate::ErrorKind;

    fn repository() -> LotRepository<InMemoryMarketStore> {
        LotRepository::new(InMemoryMarketStore::new(), Deadline::default())
    }

    fn new_lot(store_id: StoreId) -> NewLot {
        NewLot::new(store_id, UserId::new(), "Bagels", "Bakery", 24).with_weight(3.5)
    }

    #[tokio::test]
    async fn create_and_get() {
        let repo = repository();
        let lot = repo.create(new_lot(StoreId::new())).await.unwrap();
        let read = repo.get(lot.id).await.unwrap();
        assert_eq!(read, lot);
        assert_eq!(read.status, LotStatus::Available);
    }

    #[tokio::test]
    async fn create_rejects_invalid_lot() {
        let repo = repository();
        let mut lot = new_lot(StoreId::new());
        lot.title = " ".to_string();
        let err = repo.create(lot).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn update_patches_available_lot() {
        let repo = repository();
        let lot = repo.create(new_lot(StoreId::new())).await.unwrap();
        let updated = repo
            .update(
                lot.id,
                LotPatch {
                    items_count: Some(30),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.items_count, 30);
        assert_eq!(updated.version, lot.version.next());
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let repo = repository();
        let lot = repo.create(new_lot(StoreId::new())).await.unwrap();
        repo.update(
            lot.id,
            LotPatch {
                title: Some("Rye bagels".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = repo
            .update(
                lot.id,
                LotPatch {
                    items_count: Some(2),
                    expected_version: Some(lot.version),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn filtered_reads() {
        let repo = repository();
        let store_id = StoreId::new();
        let before = Utc::now() - chrono::Duration::seconds(1);
        repo.create(new_lot(store_id)).await.unwrap();
        repo.create(new_lot(StoreId::new())).await.unwrap();

        assert_eq!(repo.by_store(store_id).await.unwrap().len(), 1);
        assert_eq!(repo.by_status(LotStatus::Available).await.unwrap().len(), 2);
        assert_eq!(repo.by_status(LotStatus::Claimed).await.unwrap().len(), 0);
        assert_eq!(repo.created_after(before).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_unclaimed_lot() {
        let repo = repository();
        let lot = repo.create(new_lot(StoreId::new())).await.unwrap();
        repo.delete(lot.id).await.unwrap();

        let err = repo.get(lot.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = repo.delete(lot.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn maker_onboarding() {
        let repo = repository();
        let user_id = UserId::new();
        let profile = repo
            .register_maker(NewMaker::new(user_id, "Ines Duarte"))
            .await
            .unwrap();
        assert!(!profile.kyc_verified);

        let err = repo
            .register_maker(NewMaker::new(user_id, "Ines Duarte"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let profile = repo
            .update_contact(
                user_id,
                ContactUpdate {
                    phone: Some("+351 555 0101".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.phone.as_deref(), Some("+351 555 0101"));
        assert_eq!(profile.full_name, "Ines Duarte");

        let profile = repo.verify_kyc(user_id).await.unwrap();
        assert!(profile.kyc_verified);
        assert_eq!(profile.total_claims, 0);
    }

    #[tokio::test]
    async fn blank_maker_name_is_rejected() {
        let repo = repository();
        let err = repo
            .register_maker(NewMaker::new(UserId::new(), ""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
