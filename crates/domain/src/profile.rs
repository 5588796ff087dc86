use market_store::{MakerProfileRecord, MarketStore, MarketStoreExt, StoreError, UserId};

use crate::deadline::Deadline;
use crate::error::DomainError;

/// Attempts made by a version-guarded write before giving up.
pub(crate) const MAX_WRITE_ATTEMPTS: u32 = 10;

/// Reads a maker profile, applies `change` and writes it back guarded by the
/// version that was read. A lost race re-reads and re-applies.
pub(crate) async fn modify_profile<S, F>(
    store: &S,
    deadline: &Deadline,
    user_id: UserId,
    mut change: F,
) -> Result<MakerProfileRecord, DomainError>
where
    S: MarketStore,
    F: FnMut(MakerProfileRecord) -> Result<MakerProfileRecord, DomainError>,
{
    let mut attempt = 1;
    loop {
        let current = deadline
            .run("get_maker_profile", store.require_maker_profile(user_id))
            .await?;
        let next = change(current)?;

        match deadline
            .within("update_maker_profile", store.update_maker_profile(next))
            .await?
        {
            Ok(stored) => return Ok(stored),
            Err(StoreError::ConcurrencyConflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::debug!(%user_id, attempt, "maker profile changed concurrently, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
