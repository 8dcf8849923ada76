use rust_decimal::Decimal;

use crate::types::Listing;

/// Title marker for WBS-subsidized listings (Wohnberechtigungsschein).
const WBS_MARKER: &str = "wbs";

/// Title marker for swap listings ("Wohnungstausch").
const SWAP_MARKER: &str = "tausch";

/// Inclusion/exclusion rules applied to every fetched listing.
///
/// Built once from config at startup, immutable thereafter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterRules {
    pub exclude_wbs: bool,
    pub exclude_tausch: bool,
    /// Warm-rent ceiling; listings strictly above it are dropped.
    pub max_rent: Option<Decimal>,
}

/// A listing is kept unless its title carries an enabled ban marker or its
/// warm rent exceeds the configured ceiling. Both conditions combine as one
/// boolean expression, so their evaluation order cannot matter.
fn keeps(listing: &Listing, rules: &FilterRules) -> bool {
    let title = listing.title.to_lowercase();
    let banned = (rules.exclude_wbs && title.contains(WBS_MARKER))
        || (rules.exclude_tausch && title.contains(SWAP_MARKER));
    let over_ceiling = rules
        .max_rent
        .is_some_and(|ceiling| listing.warm_rent.value > ceiling);
    !banned && !over_ceiling
}

/// Apply the filter rules and order the survivors by ascending warm rent.
///
/// Pure and deterministic: identical listings and rules always yield the
/// same output. The sort is stable, so equal rents keep their fetch order.
pub fn select_and_order(listings: Vec<Listing>, rules: &FilterRules) -> Vec<Listing> {
    let mut kept: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| keeps(listing, rules))
        .collect();
    kept.sort_by_key(|listing| listing.warm_rent.value);
    kept
}
