//! Exchange rate tables and the fetcher abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

/// Where the rates in a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    #[default]
    Empty,
    Provider,
    Fallback,
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateSource::Empty => "empty",
                RateSource::Provider => "provider",
                RateSource::Fallback => "fallback",
            }
        )
    }
}

/// Directed `"FROM-TO"` rates, all relative to a single base currency.
///
/// A value `r` under `"A-B"` means one unit of `A` buys `r` units of `B`.
/// Only positive, finite rates are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    base: String,
    source: RateSource,
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(base: &str, source: RateSource) -> Self {
        Self {
            base: base.to_string(),
            source,
            rates: HashMap::new(),
        }
    }

    /// Builds a table of `"{base}-{code}"` entries from per-currency rates.
    pub fn from_base_rates<'a, I>(base: &str, source: RateSource, rates: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut table = Self::new(base, source);
        for (code, rate) in rates {
            if code != base {
                table.insert(base, code, rate);
            }
        }
        table
    }

    pub fn pair_key(from: &str, to: &str) -> String {
        format!("{from}-{to}")
    }

    /// Inserts a rate, returning `false` if it was rejected.
    pub fn insert(&mut self, from: &str, to: &str, rate: f64) -> bool {
        if !rate.is_finite() || rate <= 0.0 {
            debug!(from, to, rate, "Rejecting unusable rate");
            return false;
        }
        self.rates.insert(Self::pair_key(from, to), rate);
        true
    }

    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        self.rates.get(&Self::pair_key(from, to)).copied()
    }

    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.rates.contains_key(&Self::pair_key(from, to))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn source(&self) -> RateSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Entries sorted by key.
    pub fn entries(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<_> = self.rates.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Source of fresh rate tables for one base currency.
///
/// Implementations must not fail: when the upstream source is unavailable
/// they hand back a fallback table instead.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch(&self, base_currency: &str) -> RateTable;
}
