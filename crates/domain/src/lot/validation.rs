use crate::error::DomainError;

/// Categories offered when a store lists a lot. Other non-empty categories
/// are accepted.
pub const KNOWN_CATEGORIES: [&str; 10] = [
    "Dairy & Refrigerated",
    "Meat & Seafood",
    "Fresh Produce",
    "Bakery",
    "Frozen Foods",
    "Pantry & Dry Goods",
    "Beverages",
    "Health & Beauty",
    "Household Items",
    "Other",
];

/// Trims a category and folds known ones onto their listed spelling, so
/// "bakery" and "Bakery" group together in reports and filters.
pub fn canonical_category(category: &str) -> String {
    let trimmed = category.trim();
    KNOWN_CATEGORIES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(trimmed))
        .map_or_else(|| trimmed.to_string(), |known| (*known).to_string())
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn validate_items_count(items_count: i32) -> Result<(), DomainError> {
    if items_count < 1 {
        return Err(DomainError::validation(format!(
            "items_count must be at least 1, got {items_count}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_weight(weight: Option<f64>) -> Result<(), DomainError> {
    match weight {
        Some(kg) if !kg.is_finite() || kg < 0.0 => Err(DomainError::validation(format!(
            "estimated_weight_kg must be a non-negative number, got {kg}"
        ))),
        _ => Ok(()),
    }
}
