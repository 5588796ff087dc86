//! Inputs for lot and maker profile writes.

use chrono::NaiveDate;
use market_store::{LotRecord, StoreId, UserId, Version};
use serde::Deserialize;

use crate::error::DomainError;

use super::validation::{
    canonical_category, require_text, validate_items_count, validate_weight,
};

/// A lot to be listed by a store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLot {
    pub store_id: StoreId,
    pub created_by: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub items_count: i32,
    #[serde(default)]
    pub estimated_weight_kg: Option<f64>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub pickup_date: Option<NaiveDate>,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
}

impl NewLot {
    pub fn new(
        store_id: StoreId,
        created_by: UserId,
        title: impl Into<String>,
        category: impl Into<String>,
        items_count: i32,
    ) -> Self {
        Self {
            store_id,
            created_by,
            title: title.into(),
            description: None,
            category: category.into(),
            items_count,
            estimated_weight_kg: None,
            expiry_date: None,
            pickup_date: None,
            return_date: None,
        }
    }

    pub fn with_weight(mut self, kg: f64) -> Self {
        self.estimated_weight_kg = Some(kg);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("title", &self.title)?;
        require_text("category", &self.category)?;
        validate_items_count(self.items_count)?;
        validate_weight(self.estimated_weight_kg)
    }

    pub(crate) fn into_record(self) -> LotRecord {
        let mut lot = LotRecord::new(
            self.store_id,
            self.created_by,
            self.title.trim(),
            canonical_category(&self.category),
            self.items_count,
        );
        lot.description = self.description;
        lot.estimated_weight_kg = self.estimated_weight_kg;
        lot.expiry_date = self.expiry_date;
        lot.pickup_date = self.pickup_date;
        lot.return_date = self.return_date;
        lot
    }
}

/// Partial update of an available lot. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub items_count: Option<i32>,
    pub estimated_weight_kg: Option<f64>,
    pub expiry_date: Option<NaiveDate>,
    pub pickup_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,

    /// When set, the update applies only to this exact version.
    pub expected_version: Option<Version>,
}

impl LotPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.items_count.is_none()
            && self.estimated_weight_kg.is_none()
            && self.expiry_date.is_none()
            && self.pickup_date.is_none()
            && self.return_date.is_none()
    }

    pub(crate) fn apply(&self, mut lot: LotRecord) -> Result<LotRecord, DomainError> {
        if let Some(ref title) = self.title {
            require_text("title", title)?;
            lot.title = title.trim().to_string();
        }
        if let Some(ref category) = self.category {
            require_text("category", category)?;
            lot.category = canonical_category(category);
        }
        if let Some(items_count) = self.items_count {
            validate_items_count(items_count)?;
            lot.items_count = items_count;
        }
        if self.estimated_weight_kg.is_some() {
            validate_weight(self.estimated_weight_kg)?;
            lot.estimated_weight_kg = self.estimated_weight_kg;
        }
        if self.description.is_some() {
            lot.description = self.description.clone();
        }
        if self.expiry_date.is_some() {
            lot.expiry_date = self.expiry_date;
        }
        if self.pickup_date.is_some() {
            lot.pickup_date = self.pickup_date;
        }
        if self.return_date.is_some() {
            lot.return_date = self.return_date;
        }
        Ok(lot)
    }
}

/// Onboarding details for a new maker.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMaker {
    pub user_id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewMaker {
    pub fn new(user_id: UserId, full_name: impl Into<String>) -> Self {
        Self {
            user_id,
            full_name: full_name.into(),
            phone: None,
            address: None,
        }
    }
}

/// Contact fields a maker may change. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_lot() -> NewLot {
        NewLot::new(StoreId::new(), UserId::new(), " Croissants ", "Bakery", 12)
    }

    #[test]
    fn record_is_trimmed_and_available() {
        let lot = new_lot().with_weight(2.0).into_record();
        assert_eq!(lot.title, "Croissants");
        assert!(lot.is_available());
        assert_eq!(lot.estimated_weight_kg, Some(2.0));
    }

    #[test]
    fn listed_categories_are_canonicalized() {
        let mut lot = new_lot();
        lot.category = " dairy & refrigerated".to_string();
        assert_eq!(lot.into_record().category, "Dairy & Refrigerated");

        let patch = LotPatch {
            category: Some("frozen foods ".to_string()),
            ..Default::default()
        };
        let patched = patch.apply(new_lot().into_record()).unwrap();
        assert_eq!(patched.category, "Frozen Foods");

        let mut lot = new_lot();
        lot.category = "Pet Supplies".to_string();
        assert_eq!(lot.into_record().category, "Pet Supplies");
    }

    #[test]
    fn invalid_new_lot_is_rejected() {
        let mut lot = new_lot();
        lot.items_count = 0;
        assert!(lot.validate().is_err());

        let lot = new_lot().with_weight(-1.0);
        assert!(lot.validate().is_err());

        let mut lot = new_lot();
        lot.category = String::new();
        assert!(lot.validate().is_err());
    }

    #[test]
    fn patch_changes_only_set_fields() {
        let lot = new_lot().into_record();
        let patch = LotPatch {
            items_count: Some(20),
            ..Default::default()
        };
        let patched = patch.apply(lot.clone()).unwrap();
        assert_eq!(patched.items_count, 20);
        assert_eq!(patched.title, lot.title);
        assert!(!patch.is_empty());
        assert!(LotPatch::default().is_empty());
    }

    #[test]
    fn patch_validates_values() {
        let lot = new_lot().into_record();
        let patch = LotPatch {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(patch.apply(lot).is_err());
    }
}
