//! Resolves a rate for any currency pair from a base-relative table.
//!
//! Lookup order: identity, direct entry, inverse entry, triangulation through
//! the table's base currency. When nothing matches the pair resolves to `1.0`
//! and is reported as [`RatePath::Unresolved`].

use crate::core::rates::RateTable;
use std::fmt::Display;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePath {
    Identity,
    Direct,
    Inverse,
    Triangulated,
    Unresolved,
}

impl Display for RatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RatePath::Identity => "identity",
                RatePath::Direct => "direct",
                RatePath::Inverse => "inverse",
                RatePath::Triangulated => "triangulated",
                RatePath::Unresolved => "unresolved",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub rate: f64,
    pub path: RatePath,
}

impl Resolution {
    fn new(rate: f64, path: RatePath) -> Self {
        Self { rate, path }
    }
}

pub fn resolve(from: &str, to: &str, table: &RateTable) -> Resolution {
    if from == to {
        return Resolution::new(1.0, RatePath::Identity);
    }

    if let Some(rate) = table.get(from, to) {
        return Resolution::new(rate, RatePath::Direct);
    }

    if let Some(rate) = table.get(to, from) {
        return Resolution::new(1.0 / rate, RatePath::Inverse);
    }

    let base = table.base();
    if let (Some(base_from), Some(base_to)) = (table.get(base, from), table.get(base, to)) {
        debug!(from, to, base, "Triangulating rate through base currency");
        return Resolution::new(base_to / base_from, RatePath::Triangulated);
    }

    Resolution::new(1.0, RatePath::Unresolved)
}

/// Plain rate for a pair; see [`resolve`].
pub fn rate(from: &str, to: &str, table: &RateTable) -> f64 {
    resolve(from, to, table).rate
}

/// Notified whenever a pair cannot be resolved and degrades to 1:1.
pub trait ResolutionObserver: Send + Sync {
    fn on_unresolved(&self, from: &str, to: &str, base: &str);
}

/// Reports unresolved pairs as structured warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ResolutionObserver for LogObserver {
    fn on_unresolved(&self, from: &str, to: &str, base: &str) {
        warn!(
            from,
            to,
            base,
            "No rate path between currencies, converting 1:1"
        );
    }
}
