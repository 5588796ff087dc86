use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ClaimId, ClaimQuery, ClaimRecord, LotId, LotQuery, LotRecord, LotStatus, MakerProfileRecord,
    Result, ReturnedProductRecord, StoreError, UserId, Version,
    query::page_bounds,
    store::{ClaimCommit, MarketStore, validate_commit},
};

const LOT_COLUMNS: &str = "id, store_id, title, description, category, items_count, \
     estimated_weight_kg, expiry_date, pickup_date, return_date, status, claimed_by, \
     created_by, created_at, updated_at, version";

const CLAIM_COLUMNS: &str = "id, lot_id, maker_id, claimed_at, pickup_scheduled_at, \
     picked_up_at, return_scheduled_at, returned_at, completed_at, cancelled_at, \
     cancellation_reason, notes, version";

const PROFILE_COLUMNS: &str = "user_id, full_name, phone, address, rating, total_claims, \
     successful_returns, maker_tier, platinum_override, kyc_verified, created_at, updated_at, \
     version";

/// PostgreSQL-backed market store.
///
/// Conditional writes are single `UPDATE ... WHERE <guard>` statements and
/// multi-row commits run inside one transaction, so the database provides
/// the isolation.
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_lot(row: PgRow) -> Result<LotRecord> {
        Ok(LotRecord {
            id: LotId::from_uuid(row.try_get::<Uuid, _>("id")?),
            store_id: row.try_get::<Uuid, _>("store_id")?.into(),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            items_count: row.try_get("items_count")?,
            estimated_weight_kg: row.try_get("estimated_weight_kg")?,
            expiry_date: row.try_get("expiry_date")?,
            pickup_date: row.try_get("pickup_date")?,
            return_date: row.try_get("return_date")?,
            status: parse_status(row.try_get("status")?)?,
            claimed_by: row.try_get::<Option<Uuid>, _>("claimed_by")?.map(UserId::from),
            created_by: row.try_get::<Uuid, _>("created_by")?.into(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_claim(row: PgRow) -> Result<ClaimRecord> {
        Ok(ClaimRecord {
            id: ClaimId::from_uuid(row.try_get::<Uuid, _>("id")?),
            lot_id: row.try_get::<Uuid, _>("lot_id")?.into(),
            maker_id: row.try_get::<Uuid, _>("maker_id")?.into(),
            claimed_at: row.try_get("claimed_at")?,
            pickup_scheduled_at: row.try_get("pickup_scheduled_at")?,
            picked_up_at: row.try_get("picked_up_at")?,
            return_scheduled_at: row.try_get("return_scheduled_at")?,
            returned_at: row.try_get("returned_at")?,
            completed_at: row.try_get("completed_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            cancellation_reason: row.try_get("cancellation_reason")?,
            notes: row.try_get("notes")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_profile(row: PgRow) -> Result<MakerProfileRecord> {
        let tier: String = row.try_get("maker_tier")?;
        Ok(MakerProfileRecord {
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            rating: row.try_get("rating")?,
            total_claims: from_db_count(row.try_get("total_claims")?)?,
            successful_returns: from_db_count(row.try_get("successful_returns")?)?,
            maker_tier: tier
                .parse()
                .map_err(|e: common::ParseEnumError| StoreError::Decode(e.to_string()))?,
            platinum_override: row.try_get("platinum_override")?,
            kyc_verified: row.try_get("kyc_verified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_product(row: PgRow) -> Result<ReturnedProductRecord> {
        Ok(ReturnedProductRecord {
            id: row.try_get::<Uuid, _>("id")?.into(),
            claim_id: row.try_get::<Uuid, _>("claim_id")?.into(),
            product_name: row.try_get("product_name")?,
            description: row.try_get("description")?,
            estimated_value: row.try_get("estimated_value")?,
            approved_for_sale: row.try_get("approved_for_sale")?,
            review_status: row.try_get("review_status")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Explains why a guarded lot update touched no row.
    async fn lot_status_failure(
        tx: &mut Transaction<'_, Postgres>,
        lot_id: LotId,
        expected: LotStatus,
    ) -> StoreError {
        let status: std::result::Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM lots WHERE id = $1")
                .bind(lot_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await;

        match status {
            Ok(Some(actual)) => match parse_status(actual) {
                Ok(actual) => StoreError::StatusMismatch {
                    lot_id,
                    expected,
                    actual,
                },
                Err(e) => e,
            },
            Ok(None) => StoreError::LotNotFound(lot_id),
            Err(e) => StoreError::Database(e),
        }
    }

    /// Explains why a version-guarded update touched no row.
    async fn version_failure(
        tx: &mut Transaction<'_, Postgres>,
        table: &'static str,
        key_column: &'static str,
        id: Uuid,
        expected: Version,
        not_found: StoreError,
        entity: &'static str,
    ) -> StoreError {
        let sql = format!("SELECT version FROM {table} WHERE {key_column} = $1");
        let version: std::result::Result<Option<i64>, sqlx::Error> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await;

        match version {
            Ok(Some(actual)) => StoreError::ConcurrencyConflict {
                entity,
                id: id.to_string(),
                expected,
                actual: Version::new(actual),
            },
            Ok(None) => not_found,
            Err(e) => StoreError::Database(e),
        }
    }

    async fn write_profile(
        tx: &mut Transaction<'_, Postgres>,
        profile: &MakerProfileRecord,
        expected: Version,
    ) -> Result<Option<PgRow>> {
        let sql = format!(
            r#"
            UPDATE maker_profiles SET
                full_name = $3, phone = $4, address = $5, rating = $6, total_claims = $7,
                successful_returns = $8, maker_tier = $9, platinum_override = $10,
                kyc_verified = $11, updated_at = $12, version = version + 1
            WHERE user_id = $1 AND version = $2
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(profile.user_id.as_uuid())
            .bind(expected.as_i64())
            .bind(&profile.full_name)
            .bind(&profile.phone)
            .bind(&profile.address)
            .bind(profile.rating)
            .bind(to_db_count(profile.total_claims)?)
            .bind(to_db_count(profile.successful_returns)?)
            .bind(profile.maker_tier.as_str())
            .bind(profile.platinum_override)
            .bind(profile.kyc_verified)
            .bind(Utc::now())
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row)
    }
}

fn parse_status(value: String) -> Result<LotStatus> {
    value
        .parse()
        .map_err(|e: common::ParseEnumError| StoreError::Decode(e.to_string()))
}

fn to_db_count(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::Decode(format!("count out of range: {value}")))
}

fn from_db_count(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::Decode(format!("negative count: {value}")))
}

/// Escapes LIKE wildcards so a search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn insert_lot(&self, lot: LotRecord) -> Result<LotRecord> {
        let sql = format!(
            r#"
            INSERT INTO lots ({LOT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 1)
            RETURNING {LOT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(lot.id.as_uuid())
            .bind(lot.store_id.as_uuid())
            .bind(&lot.title)
            .bind(&lot.description)
            .bind(&lot.category)
            .bind(lot.items_count)
            .bind(lot.estimated_weight_kg)
            .bind(lot.expiry_date)
            .bind(lot.pickup_date)
            .bind(lot.return_date)
            .bind(lot.status.as_str())
            .bind(lot.claimed_by.map(|id| id.as_uuid()))
            .bind(lot.created_by.as_uuid())
            .bind(lot.created_at)
            .bind(lot.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return StoreError::Duplicate {
                        entity: "lot",
                        id: lot.id.to_string(),
                    };
                }
                StoreError::Database(e)
            })?;

        Self::row_to_lot(row)
    }

    async fn get_lot(&self, lot_id: LotId) -> Result<Option<LotRecord>> {
        let sql = format!("SELECT {LOT_COLUMNS} FROM lots WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(lot_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_lot).transpose()
    }

    async fn update_lot(&self, lot: LotRecord) -> Result<LotRecord> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            UPDATE lots SET
                store_id = $3, title = $4, description = $5, category = $6, items_count = $7,
                estimated_weight_kg = $8, expiry_date = $9, pickup_date = $10, return_date = $11,
                updated_at = $12, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {LOT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(lot.id.as_uuid())
            .bind(lot.version.as_i64())
            .bind(lot.store_id.as_uuid())
            .bind(&lot.title)
            .bind(&lot.description)
            .bind(&lot.category)
            .bind(lot.items_count)
            .bind(lot.estimated_weight_kg)
            .bind(lot.expiry_date)
            .bind(lot.pickup_date)
            .bind(lot.return_date)
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?;

        match row {
            Some(row) => {
                tx.commit().await?;
                Self::row_to_lot(row)
            }
            None => Err(Self::version_failure(
                &mut tx,
                "lots",
                "id",
                lot.id.as_uuid(),
                lot.version,
                StoreError::LotNotFound(lot.id),
                "lot",
            )
            .await),
        }
    }

    async fn delete_lot(&self, lot_id: LotId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let has_claims: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM claims WHERE lot_id = $1)")
                .bind(lot_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        if has_claims {
            return Err(StoreError::HasClaims(lot_id));
        }

        let result = sqlx::query("DELETE FROM lots WHERE id = $1")
            .bind(lot_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A claim inserted after the EXISTS check still blocks the delete.
                if is_foreign_key_violation(&e) {
                    return StoreError::HasClaims(lot_id);
                }
                StoreError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LotNotFound(lot_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query_lots(&self, query: LotQuery) -> Result<Vec<LotRecord>> {
        let (offset, limit) = page_bounds(query.offset, query.limit)?;
        let mut sql = format!("SELECT {LOT_COLUMNS} FROM lots WHERE 1=1");
        let mut param_count = 0;

        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.store_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND store_id = ${param_count}"));
        }
        if query.created_by.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_by = ${param_count}"));
        }
        if query.claimed_by.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND claimed_by = ${param_count}"));
        }
        if query.category.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category = ${param_count}"));
        }
        if query.created_after.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at > ${param_count}"));
        }
        if query.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (title ILIKE ${param_count} OR category ILIKE ${param_count})"
            ));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(store_id) = query.store_id {
            sqlx_query = sqlx_query.bind(store_id.as_uuid());
        }
        if let Some(created_by) = query.created_by {
            sqlx_query = sqlx_query.bind(created_by.as_uuid());
        }
        if let Some(claimed_by) = query.claimed_by {
            sqlx_query = sqlx_query.bind(claimed_by.as_uuid());
        }
        if let Some(category) = query.category {
            sqlx_query = sqlx_query.bind(category);
        }
        if let Some(after) = query.created_after {
            sqlx_query = sqlx_query.bind(after);
        }
        if let Some(term) = query.search {
            sqlx_query = sqlx_query.bind(like_pattern(&term));
        }
        if let Some(limit) = limit {
            sqlx_query = sqlx_query.bind(limit);
        }
        if let Some(offset) = offset {
            sqlx_query = sqlx_query.bind(offset);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_lot).collect()
    }

    async fn claim_lot(&self, claim: ClaimRecord) -> Result<(LotRecord, ClaimRecord)> {
        let mut tx = self.pool.begin().await?;

        // The status guard and the write are one statement: concurrent
        // claimers serialize on the row lock and only one sees 'available'.
        let sql = format!(
            r#"
            UPDATE lots
            SET status = 'claimed', claimed_by = $2, updated_at = $3, version = version + 1
            WHERE id = $1 AND status = 'available'
            RETURNING {LOT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(claim.lot_id.as_uuid())
            .bind(claim.maker_id.as_uuid())
            .bind(claim.claimed_at)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            metrics::counter!("store_guard_failures_total", "op" => "claim_lot").increment(1);
            return Err(Self::lot_status_failure(&mut tx, claim.lot_id, LotStatus::Available).await);
        };
        let lot = Self::row_to_lot(row)?;

        let sql = format!(
            r#"
            INSERT INTO claims ({CLAIM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1)
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(claim.id.as_uuid())
            .bind(claim.lot_id.as_uuid())
            .bind(claim.maker_id.as_uuid())
            .bind(claim.claimed_at)
            .bind(claim.pickup_scheduled_at)
            .bind(claim.picked_up_at)
            .bind(claim.return_scheduled_at)
            .bind(claim.returned_at)
            .bind(claim.completed_at)
            .bind(claim.cancelled_at)
            .bind(&claim.cancellation_reason)
            .bind(&claim.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return StoreError::MakerNotFound(claim.maker_id);
                }
                if is_unique_violation(&e) {
                    return StoreError::Duplicate {
                        entity: "claim",
                        id: claim.id.to_string(),
                    };
                }
                StoreError::Database(e)
            })?;
        let claim = Self::row_to_claim(row)?;

        tx.commit().await?;
        Ok((lot, claim))
    }

    async fn get_claim(&self, claim_id: ClaimId) -> Result<Option<ClaimRecord>> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(claim_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_claim).transpose()
    }

    async fn query_claims(&self, query: ClaimQuery) -> Result<Vec<ClaimRecord>> {
        let (offset, limit) = page_bounds(query.offset, query.limit)?;
        let mut sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE 1=1");
        let mut param_count = 0;

        if query.lot_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND lot_id = ${param_count}"));
        }
        if query.maker_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND maker_id = ${param_count}"));
        }
        if query.open_only {
            sql.push_str(" AND completed_at IS NULL AND cancelled_at IS NULL");
        }

        sql.push_str(" ORDER BY claimed_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(lot_id) = query.lot_id {
            sqlx_query = sqlx_query.bind(lot_id.as_uuid());
        }
        if let Some(maker_id) = query.maker_id {
            sqlx_query = sqlx_query.bind(maker_id.as_uuid());
        }
        if let Some(limit) = limit {
            sqlx_query = sqlx_query.bind(limit);
        }
        if let Some(offset) = offset {
            sqlx_query = sqlx_query.bind(offset);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_claim).collect()
    }

    async fn commit_claim(&self, commit: ClaimCommit) -> Result<ClaimRecord> {
        validate_commit(&commit)?;
        let claim = &commit.claim;
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE claims SET
                pickup_scheduled_at = $3, picked_up_at = $4, return_scheduled_at = $5,
                returned_at = $6, completed_at = $7, cancelled_at = $8,
                cancellation_reason = $9, notes = $10, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(claim.id.as_uuid())
            .bind(commit.expected_version.as_i64())
            .bind(claim.pickup_scheduled_at)
            .bind(claim.picked_up_at)
            .bind(claim.return_scheduled_at)
            .bind(claim.returned_at)
            .bind(claim.completed_at)
            .bind(claim.cancelled_at)
            .bind(&claim.cancellation_reason)
            .bind(&claim.notes)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(Self::version_failure(
                &mut tx,
                "claims",
                "id",
                claim.id.as_uuid(),
                commit.expected_version,
                StoreError::ClaimNotFound(claim.id),
                "claim",
            )
            .await);
        };
        let stored = Self::row_to_claim(row)?;

        if let Some(transition) = commit.lot_transition {
            let result = sqlx::query(
                r#"
                UPDATE lots SET status = $3, updated_at = $4, version = version + 1
                WHERE id = $1 AND status = $2
                "#,
            )
            .bind(transition.lot_id.as_uuid())
            .bind(transition.from.as_str())
            .bind(transition.to.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                metrics::counter!("store_guard_failures_total", "op" => "commit_claim")
                    .increment(1);
                return Err(
                    Self::lot_status_failure(&mut tx, transition.lot_id, transition.from).await,
                );
            }
        }

        if let Some((profile, expected)) = &commit.profile
            && Self::write_profile(&mut tx, profile, *expected)
                .await?
                .is_none()
        {
            return Err(Self::version_failure(
                &mut tx,
                "maker_profiles",
                "user_id",
                profile.user_id.as_uuid(),
                *expected,
                StoreError::MakerNotFound(profile.user_id),
                "maker profile",
            )
            .await);
        }

        for product in &commit.returned_products {
            sqlx::query(
                r#"
                INSERT INTO returned_products
                    (id, claim_id, product_name, description, estimated_value,
                     approved_for_sale, review_status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(product.id.as_uuid())
            .bind(product.claim_id.as_uuid())
            .bind(&product.product_name)
            .bind(&product.description)
            .bind(product.estimated_value)
            .bind(product.approved_for_sale)
            .bind(&product.review_status)
            .bind(product.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(claim_id = %stored.id, version = %stored.version, "claim committed");
        Ok(stored)
    }

    async fn insert_maker_profile(&self, profile: MakerProfileRecord) -> Result<MakerProfileRecord> {
        let sql = format!(
            r#"
            INSERT INTO maker_profiles ({PROFILE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1)
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(profile.user_id.as_uuid())
            .bind(&profile.full_name)
            .bind(&profile.phone)
            .bind(&profile.address)
            .bind(profile.rating)
            .bind(to_db_count(profile.total_claims)?)
            .bind(to_db_count(profile.successful_returns)?)
            .bind(profile.maker_tier.as_str())
            .bind(profile.platinum_override)
            .bind(profile.kyc_verified)
            .bind(profile.created_at)
            .bind(profile.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return StoreError::Duplicate {
                        entity: "maker profile",
                        id: profile.user_id.to_string(),
                    };
                }
                StoreError::Database(e)
            })?;

        Self::row_to_profile(row)
    }

    async fn get_maker_profile(&self, user_id: UserId) -> Result<Option<MakerProfileRecord>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM maker_profiles WHERE user_id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_profile).transpose()
    }

    async fn update_maker_profile(&self, profile: MakerProfileRecord) -> Result<MakerProfileRecord> {
        let mut tx = self.pool.begin().await?;
        match Self::write_profile(&mut tx, &profile, profile.version).await? {
            Some(row) => {
                tx.commit().await?;
                Self::row_to_profile(row)
            }
            None => Err(Self::version_failure(
                &mut tx,
                "maker_profiles",
                "user_id",
                profile.user_id.as_uuid(),
                profile.version,
                StoreError::MakerNotFound(profile.user_id),
                "maker profile",
            )
            .await),
        }
    }

    async fn list_maker_profiles(&self) -> Result<Vec<MakerProfileRecord>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM maker_profiles ORDER BY created_at ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_profile).collect()
    }

    async fn returned_products_for_claim(
        &self,
        claim_id: ClaimId,
    ) -> Result<Vec<ReturnedProductRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, claim_id, product_name, description, estimated_value,
                   approved_for_sale, review_status, created_at
            FROM returned_products
            WHERE claim_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(claim_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }
}
