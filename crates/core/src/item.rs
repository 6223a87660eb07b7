//! Business rules for items: name normalization, field limits and the
//! duplicate-name scan used by bulk creation.
//!
//! All checks operate on the *normalized* (trimmed) name, which is also the
//! form persisted in storage.

use std::collections::HashSet;

use crate::error::CoreError;

/// Entity label used in `CoreError::NotFound`.
pub const ITEM_ENTITY: &str = "Item";

/// Maximum length of a normalized item name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Largest accepted item amount.
pub const MAX_AMOUNT: u32 = 999_999;

/// Hard cap on the number of items accepted by one bulk create request.
pub const MAX_BULK_ITEMS: usize = 1000;

/// Number of names sent to storage per duplicate-check query.
///
/// Equal to [`MAX_BULK_ITEMS`] today, kept separate so the query parameter
/// count stays bounded if the bulk cap is ever raised.
pub const DUPLICATE_CHECK_BATCH_SIZE: usize = 1000;

pub const NAME_REQUIRED: &str = "item name is required";
pub const NAME_TOO_LONG: &str = "item name cannot exceed 100 characters";
pub const AMOUNT_TOO_LARGE: &str = "item amount cannot exceed 999999";
pub const NO_UPDATES: &str = "no updates provided";
pub const BULK_EMPTY: &str = "at least one item is required";
pub const BULK_TOO_LARGE: &str = "bulk create cannot exceed 1000 items";

/// Message carried by `CoreError::Conflict` when a name is taken.
pub const ALREADY_EXISTS: &str = "Item with same name already exists";

/// Strip surrounding whitespace from a user-supplied name.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// Check a normalized name against the emptiness and length rules.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(NAME_REQUIRED.to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(CoreError::Validation(NAME_TOO_LONG.to_string()));
    }
    Ok(())
}

pub fn validate_amount(amount: u32) -> Result<(), CoreError> {
    if amount > MAX_AMOUNT {
        return Err(CoreError::Validation(AMOUNT_TOO_LARGE.to_string()));
    }
    Ok(())
}

/// Validate a complete item candidate (normalized name + amount).
pub fn validate_item(name: &str, amount: u32) -> Result<(), CoreError> {
    validate_name(name)?;
    validate_amount(amount)
}

/// Reject empty or oversized bulk requests before any storage access.
pub fn validate_bulk_size(count: usize) -> Result<(), CoreError> {
    if count == 0 {
        return Err(CoreError::Validation(BULK_EMPTY.to_string()));
    }
    if count > MAX_BULK_ITEMS {
        return Err(CoreError::Validation(BULK_TOO_LARGE.to_string()));
    }
    Ok(())
}

/// Return the first name that appears more than once, in input order.
///
/// Comparison is exact and case-sensitive, matching the storage constraint.
pub fn find_duplicate_name<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // -- normalize_name ------------------------------------------------------

    #[test]
    fn normalize_trims_surrounding_whitespace() {
        assert_eq!(normalize_name("  Foo  "), "Foo");
        assert_eq!(normalize_name("\tFoo Bar\n"), "Foo Bar");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_name("  Foo  ");
        assert_eq!(normalize_name(&once), once);
    }

    // -- validate_name -------------------------------------------------------

    #[test]
    fn name_of_exactly_100_chars_is_accepted() {
        let name = "a".repeat(100);
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn name_of_101_chars_is_rejected() {
        let name = "a".repeat(101);
        assert_matches!(validate_name(&name), Err(CoreError::Validation(msg)) if msg == NAME_TOO_LONG);
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        let name = "é".repeat(100);
        assert!(name.len() > 100);
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn empty_and_blank_names_are_rejected() {
        assert_matches!(validate_name(""), Err(CoreError::Validation(msg)) if msg == NAME_REQUIRED);
        assert_matches!(validate_name("   "), Err(CoreError::Validation(msg)) if msg == NAME_REQUIRED);
    }

    // -- validate_amount -----------------------------------------------------

    #[test]
    fn amount_boundaries() {
        assert!(validate_amount(0).is_ok());
        assert!(validate_amount(999_999).is_ok());
        assert_matches!(
            validate_amount(1_000_000),
            Err(CoreError::Validation(msg)) if msg == AMOUNT_TOO_LARGE
        );
    }

    #[test]
    fn validate_item_checks_name_before_amount() {
        assert_matches!(
            validate_item("", 1_000_000),
            Err(CoreError::Validation(msg)) if msg == NAME_REQUIRED
        );
    }

    // -- validate_bulk_size --------------------------------------------------

    #[test]
    fn bulk_size_bounds() {
        assert_matches!(validate_bulk_size(0), Err(CoreError::Validation(msg)) if msg == BULK_EMPTY);
        assert!(validate_bulk_size(1).is_ok());
        assert!(validate_bulk_size(MAX_BULK_ITEMS).is_ok());
        assert_matches!(
            validate_bulk_size(MAX_BULK_ITEMS + 1),
            Err(CoreError::Validation(msg)) if msg == BULK_TOO_LARGE
        );
    }

    // -- find_duplicate_name -------------------------------------------------

    #[test]
    fn duplicate_scan_finds_first_repeat() {
        let names = ["X", "Y", "Z", "Y", "X"];
        assert_eq!(find_duplicate_name(names), Some("Y"));
    }

    #[test]
    fn duplicate_scan_is_case_sensitive() {
        assert_eq!(find_duplicate_name(["x", "X"]), None);
    }

    #[test]
    fn duplicate_scan_on_unique_names() {
        assert_eq!(find_duplicate_name(["a", "b", "c"]), None);
        assert_eq!(find_duplicate_name(std::iter::empty::<&str>()), None);
    }
}
