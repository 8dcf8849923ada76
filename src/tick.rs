use chrono::Utc;
use tracing::{info, warn};

use crate::api::{FetchError, ListingSource};
use crate::engine::{self, FilterRules};
use crate::reporter::{self, Sink};
use crate::state::SeenListings;
use crate::types::{RunSummary, TickReport};

/// Dispatch-loop state carried across ticks.
///
/// `warmup` is true only until the first tick starts; it is consumed
/// unconditionally, even when that tick fails mid-fetch.
#[derive(Debug)]
pub struct TickState {
    pub seen: SeenListings,
    warmup: bool,
    pub total_ticks: u64,
    pub total_notified: u64,
    pub total_sink_failures: u64,
}

impl TickState {
    pub fn new() -> Self {
        Self {
            seen: SeenListings::new(),
            warmup: true,
            total_ticks: 0,
            total_notified: 0,
            total_sink_failures: 0,
        }
    }

    /// True until the first tick has run.
    pub fn in_warmup(&self) -> bool {
        self.warmup
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_ticks: self.total_ticks,
            total_notified: self.total_notified,
            total_sink_failures: self.total_sink_failures,
            seen_listings: self.seen.len(),
        }
    }
}

impl Default for TickState {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute one polling tick: fetch, filter, classify, notify.
///
/// A fetch failure aborts the tick before any classification or
/// notification happens. Sink failures are counted and logged but do not
/// stop the remaining listings from being evaluated, and a failed send is
/// never retried — delivery is at most once per listing per process
/// lifetime.
pub async fn run_tick(
    source: &dyn ListingSource,
    sink: &dyn Sink,
    rules: &FilterRules,
    notify_on_warmup: bool,
    state: &mut TickState,
) -> Result<TickReport, FetchError> {
    // Warmup ends with the first tick no matter how that tick goes.
    let warmup = std::mem::replace(&mut state.warmup, false);
    state.total_ticks += 1;

    let fetched = source.fetch_all().await?;
    let fetched_count = fetched.len();

    let selected = engine::select_and_order(fetched, rules);
    let kept = selected.len();

    let mut fresh = 0usize;
    let mut notified = 0usize;
    let mut sink_failures = 0usize;

    for listing in selected {
        if !state.seen.is_new(&listing.id) {
            continue;
        }
        fresh += 1;

        let message = reporter::format_listing(&listing);
        let link = listing.link.clone();
        state.seen.record(listing);

        if warmup && !notify_on_warmup {
            continue;
        }
        info!("Found new offer {link}");
        match sink.send(&message).await {
            Ok(()) => notified += 1,
            Err(e) => {
                sink_failures += 1;
                warn!("failed to deliver notification for {link}: {e}");
            }
        }
    }

    state.total_notified += notified as u64;
    state.total_sink_failures += sink_failures as u64;

    Ok(TickReport {
        timestamp: Utc::now().to_rfc3339(),
        fetched: fetched_count,
        kept,
        fresh,
        notified,
        sink_failures,
    })
}
