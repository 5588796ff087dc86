use chrono::{DateTime, Utc};

use crate::{ClaimRecord, LotId, LotRecord, LotStatus, Result, StoreError, StoreId, UserId};

/// Builder for filtered lot reads.
///
/// All filters are combined with AND. Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct LotQuery {
    pub status: Option<LotStatus>,
    pub store_id: Option<StoreId>,
    pub created_by: Option<UserId>,
    pub claimed_by: Option<UserId>,
    pub category: Option<String>,

    /// Case-insensitive substring match against title or category.
    pub search: Option<String>,

    /// Only lots created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LotQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: LotStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    pub fn claimed_by(mut self, user_id: UserId) -> Self {
        self.claimed_by = Some(user_id);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Evaluates the filters against a single lot, ignoring paging.
    pub fn matches(&self, lot: &LotRecord) -> bool {
        if let Some(status) = self.status
            && lot.status != status
        {
            return false;
        }
        if let Some(store_id) = self.store_id
            && lot.store_id != store_id
        {
            return false;
        }
        if let Some(created_by) = self.created_by
            && lot.created_by != created_by
        {
            return false;
        }
        if let Some(claimed_by) = self.claimed_by
            && lot.claimed_by != Some(claimed_by)
        {
            return false;
        }
        if let Some(ref category) = self.category
            && &lot.category != category
        {
            return false;
        }
        if let Some(after) = self.created_after
            && lot.created_at <= after
        {
            return false;
        }
        if let Some(ref term) = self.search {
            let term = term.to_lowercase();
            if !lot.title.to_lowercase().contains(&term)
                && !lot.category.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }
}

/// Builder for filtered claim reads. Results are ordered by `claimed_at`
/// descending.
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
    pub lot_id: Option<LotId>,
    pub maker_id: Option<UserId>,

    /// Only claims that are neither completed nor cancelled.
    pub open_only: bool,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ClaimQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_lot(lot_id: LotId) -> Self {
        Self {
            lot_id: Some(lot_id),
            ..Default::default()
        }
    }

    pub fn for_maker(maker_id: UserId) -> Self {
        Self {
            maker_id: Some(maker_id),
            ..Default::default()
        }
    }

    pub fn open_only(mut self) -> Self {
        self.open_only = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, claim: &ClaimRecord) -> bool {
        if let Some(lot_id) = self.lot_id
            && claim.lot_id != lot_id
        {
            return false;
        }
        if let Some(maker_id) = self.maker_id
            && claim.maker_id != maker_id
        {
            return false;
        }
        !(self.open_only && claim.is_closed())
    }
}

/// Offset and limit as signed SQL bounds, rejecting values past `i64::MAX`.
pub(crate) fn page_bounds(
    offset: Option<usize>,
    limit: Option<usize>,
) -> Result<(Option<i64>, Option<i64>)> {
    let bound = |name: &str, value: Option<usize>| {
        value
            .map(|v| {
                i64::try_from(v)
                    .map_err(|_| StoreError::InvalidQuery(format!("{name} {v} is out of range")))
            })
            .transpose()
    };
    Ok((bound("offset", offset)?, bound("limit", limit)?))
}

/// Applies offset then limit to an already ordered result set.
pub(crate) fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset.unwrap_or(0));
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}
