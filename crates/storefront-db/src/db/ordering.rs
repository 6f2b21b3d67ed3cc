//! Position bookkeeping shared by every repository implementation.
//!
//! Positions are 0-based and contiguous after each mutation: the stored position of a
//! bundle is its index in the owner's ordered id list.

use std::collections::HashSet;
use storefront_core::AppError;
use uuid::Uuid;

/// Index at which a new bundle lands in a list of `count` bundles.
///
/// Out-of-range requests are clamped; `None` appends.
pub fn insertion_index(requested: Option<i32>, count: usize) -> usize {
    match requested {
        Some(position) if position <= 0 => 0,
        Some(position) => (position as usize).min(count),
        None => count,
    }
}

/// Check that `requested` is a permutation of `current`.
pub fn validate_ordering(current: &[Uuid], requested: &[Uuid]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(requested.len());
    if let Some(duplicate) = requested.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::IncompleteOrdering(format!(
            "Bundle {} appears more than once",
            duplicate
        )));
    }

    let owned: HashSet<&Uuid> = current.iter().collect();
    if let Some(unknown) = requested.iter().find(|id| !owned.contains(id)) {
        return Err(AppError::IncompleteOrdering(format!(
            "Bundle {} does not belong to this owner",
            unknown
        )));
    }

    if requested.len() != current.len() {
        let missing = current
            .iter()
            .filter(|id| !seen.contains(*id))
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AppError::IncompleteOrdering(format!(
            "Ordering is missing bundles: {}",
            missing
        )));
    }

    Ok(())
}

/// `(id, position)` pairs for an ordered id list.
pub fn positions(ids: &[Uuid]) -> (Vec<Uuid>, Vec<i32>) {
    let positions = (0..ids.len() as i32).collect();
    (ids.to_vec(), positions)
}
