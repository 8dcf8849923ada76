use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary amount as reported by the search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub value: Decimal,
    #[serde(default)]
    pub currency: String,
}

/// One normalized real-estate offer.
///
/// Built fresh from the wire shape every poll cycle; `id` is the stable
/// external identifier and the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    /// Total rent including utilities — sort key and ceiling target.
    pub warm_rent: Money,
    /// Base rent without utilities.
    pub cold_rent: Money,
    /// Living space in m².
    pub living_space: f32,
    /// Fractional room counts are common (2.5 rooms).
    pub number_of_rooms: f32,
    /// Exposé URL derived from `id`.
    pub link: String,
}

/// Outcome of a single polling tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub timestamp: String,
    /// Listings returned by the search, before filtering.
    pub fetched: usize,
    /// Listings that survived the filter rules.
    pub kept: usize,
    /// Listings not present in the seen-set before this tick.
    pub fresh: usize,
    pub notified: usize,
    pub sink_failures: usize,
}

/// Process-lifetime totals, emitted on shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_ticks: u64,
    pub total_notified: u64,
    pub total_sink_failures: u64,
    pub seen_listings: usize,
}
