//! Hardcoded last-resort rates used when the provider is unreachable.
//!
//! These are approximations and are never refreshed.

use crate::core::rates::{RateFetcher, RateSource, RateTable};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Units of each currency per one US dollar.
const USD_ANCHORS: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("KES", 130.0),
    ("UGX", 3700.0),
    ("TZS", 2500.0),
    ("RWF", 1300.0),
    ("NGN", 1550.0),
    ("ZAR", 18.5),
    ("GHS", 15.5),
    ("ETB", 57.0),
    ("INR", 83.0),
    ("JPY", 150.0),
    ("CNY", 7.2),
    ("AED", 3.67),
];

/// Curated cross rates between common non-base pairs.
const CROSS_RATES: &[(&str, &str, f64)] = &[
    ("KES", "UGX", 28.46),
    ("KES", "TZS", 19.23),
    ("KES", "RWF", 10.0),
    ("UGX", "TZS", 0.68),
    ("EUR", "GBP", 0.86),
];

fn anchor(code: &str) -> Option<f64> {
    USD_ANCHORS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, rate)| *rate)
}

/// Builds the fallback table for `base`.
///
/// Rates are rebased from the USD anchors when `base` is known; otherwise the
/// USD table is returned as is.
pub fn fallback_rates(base: &str) -> RateTable {
    let mut table = match anchor(base) {
        Some(base_per_usd) => RateTable::from_base_rates(
            base,
            RateSource::Fallback,
            USD_ANCHORS
                .iter()
                .map(|(code, per_usd)| (*code, per_usd / base_per_usd)),
        ),
        None => {
            warn!(base, "No fallback anchor for base currency, using USD rates");
            RateTable::from_base_rates("USD", RateSource::Fallback, USD_ANCHORS.iter().copied())
        }
    };

    for (from, to, rate) in CROSS_RATES {
        if !table.contains(from, to) {
            table.insert(from, to, *rate);
        }
    }

    debug!(base = table.base(), entries = table.len(), "Built fallback rate table");
    table
}

/// Serves the fallback table without touching the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackFetcher;

#[async_trait]
impl RateFetcher for FallbackFetcher {
    async fn fetch(&self, base_currency: &str) -> RateTable {
        fallback_rates(base_currency)
    }
}
