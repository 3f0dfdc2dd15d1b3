use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use super::{Check, RuleCatalog};
use crate::target::Target;

/// Narrow the catalog to the checks that should run against `target`.
///
/// Checks must apply to the target (kind, version range, platform,
/// edition). With a non-empty `categories` filter, a check is kept when any
/// of its tags equals one of the categories exactly. The result is ordered
/// by check identifier and may be empty.
pub fn select(
    catalog: &RuleCatalog,
    target: &Target,
    categories: Option<&[String]>,
) -> Vec<Arc<Check>> {
    let filter = categories.filter(|c| !c.is_empty());

    let selected: Vec<Arc<Check>> = catalog
        .checks()
        .filter(|check| check.applies_to(target))
        .filter(|check| filter.map_or(true, |f| check.has_any_tag(f)))
        .cloned()
        .collect();

    tracing::debug!(
        server = %target.name,
        filter = ?filter,
        selected = selected.len(),
        "checks selected"
    );
    selected
}

/// A filter token that matches no available category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownCategory {
    pub token: String,
    /// Closest available category, if one is near enough to be a typo.
    pub suggestion: Option<String>,
}

const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Report filter tokens that are not among `available` categories.
pub fn unknown_categories(filter: &[String], available: &BTreeSet<String>) -> Vec<UnknownCategory> {
    filter
        .iter()
        .filter(|token| !available.contains(*token))
        .map(|token| UnknownCategory {
            token: token.clone(),
            suggestion: closest(token, available),
        })
        .collect()
}

fn closest(token: &str, available: &BTreeSet<String>) -> Option<String> {
    let lowered = token.to_lowercase();
    available
        .iter()
        .map(|candidate| {
            (
                levenshtein::levenshtein(&lowered, &candidate.to_lowercase()),
                candidate,
            )
        })
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.clone())
}
