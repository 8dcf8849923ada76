use std::collections::HashMap;

use crate::types::Listing;

/// Process-lifetime record of every listing observed so far, keyed by id.
///
/// Owned by the dispatch loop — never global. Grows monotonically for the
/// life of the run and is discarded on exit; nothing is persisted.
#[derive(Debug, Default)]
pub struct SeenListings {
    seen: HashMap<String, Listing>,
}

impl SeenListings {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the id has never been recorded.
    pub fn is_new(&self, id: &str) -> bool {
        !self.seen.contains_key(id)
    }

    /// Insert unconditionally. Re-recording a known id keeps the first
    /// value, so a listing whose title or rent changed upstream still
    /// counts as seen.
    pub fn record(&mut self, listing: Listing) {
        self.seen.entry(listing.id.clone()).or_insert(listing);
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.seen.get(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Money;
    use rust_decimal_macros::dec;

    fn listing(id: &str, title: &str) -> Listing {
        Listing {
            id: id.to_string(),
            title: title.to_string(),
            warm_rent: Money {
                value: dec!(1000),
                currency: "EUR".to_string(),
            },
            cold_rent: Money {
                value: dec!(800),
                currency: "EUR".to_string(),
            },
            living_space: 60.0,
            number_of_rooms: 2.0,
            link: format!("https://www.immobilienscout24.de/expose/{id}"),
        }
    }

    #[test]
    fn unknown_id_is_new() {
        let seen = SeenListings::new();
        assert!(seen.is_new("123"));
        assert!(seen.is_empty());
    }

    #[test]
    fn recorded_id_is_seen() {
        let mut seen = SeenListings::new();
        seen.record(listing("123", "A"));
        assert!(!seen.is_new("123"));
        assert!(seen.is_new("456"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn re_recording_keeps_the_first_value() {
        let mut seen = SeenListings::new();
        seen.record(listing("123", "original title"));
        seen.record(listing("123", "changed title"));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen.get("123").unwrap().title, "original title");
    }
}
