//! Amount and batch conversion on top of the rate store

use crate::core::currency::{self, normalize_code};
use crate::core::entity::{ConversionStamp, Convertible, FieldError};
use crate::core::rates::RateTable;
use crate::core::resolver::{self, LogObserver, RatePath, Resolution, ResolutionObserver};
use crate::store::RateStore;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFailure {
    pub entity_id: String,
    pub reason: String,
}

/// Result of a batch conversion. Always produced, even when items fail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome<E> {
    pub converted_entities: Vec<E>,
    pub converted_count: usize,
    pub failed_count: usize,
    pub success: bool,
    pub message: String,
    pub rate: f64,
    pub failures: Vec<EntityFailure>,
}

pub struct Converter {
    store: Arc<RateStore>,
    observer: Arc<dyn ResolutionObserver>,
}

impl Converter {
    pub fn new(store: Arc<RateStore>) -> Self {
        Self {
            store,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &Arc<RateStore> {
        &self.store
    }

    fn resolve_in(&self, from: &str, to: &str, table: &RateTable) -> Resolution {
        let resolution = resolver::resolve(from, to, table);
        if resolution.path == RatePath::Unresolved {
            self.observer.on_unresolved(from, to, table.base());
        } else {
            debug!(from, to, rate = resolution.rate, path = %resolution.path, "Resolved rate");
        }
        resolution
    }

    /// Resolves the pair against the current rates.
    pub async fn resolve(&self, from: &str, to: &str) -> Resolution {
        let (from, to) = (normalize_code(from), normalize_code(to));
        if from == to {
            return resolver::resolve(&from, &to, &RateTable::default());
        }
        let table = self.store.get_rates().await;
        self.resolve_in(&from, &to, &table)
    }

    pub async fn get_exchange_rate(&self, from: &str, to: &str) -> f64 {
        self.resolve(from, to).await.rate
    }

    /// Converts `amount` and rounds it to the target currency's precision.
    pub async fn convert_amount(&self, amount: f64, from: &str, to: &str) -> f64 {
        let rate = self.get_exchange_rate(from, to).await;
        currency::round(amount * rate, &normalize_code(to))
    }

    /// Converts the `fields` of every entity from `from` to `to`.
    ///
    /// All entities are converted against one rate snapshot. An entity whose
    /// fields cannot be read is passed through unchanged and counted as failed.
    /// The input slice is never modified.
    #[instrument(skip(self, entities), fields(count = entities.len()))]
    pub async fn convert_batch<E: Convertible>(
        &self,
        entities: &[E],
        from: &str,
        to: &str,
        fields: &[&str],
    ) -> ConversionOutcome<E> {
        let (from, to) = (normalize_code(from), normalize_code(to));
        let rate = self.resolve(&from, &to).await.rate;
        let converted_at = Utc::now();

        let mut converted_entities = Vec::with_capacity(entities.len());
        let mut failures = Vec::new();

        for entity in entities {
            match convert_entity(entity, fields, rate, &to) {
                Ok((mut converted, original_amounts)) => {
                    converted.stamp(&ConversionStamp {
                        original_amounts,
                        original_currency: from.clone(),
                        currency: to.clone(),
                        rate,
                        converted_at,
                    });
                    converted_entities.push(converted);
                }
                Err(e) => {
                    let entity_id = entity.entity_id();
                    warn!(entity = %entity_id, error = %e, "Failed to convert entity");
                    failures.push(EntityFailure {
                        entity_id,
                        reason: e.to_string(),
                    });
                    converted_entities.push(entity.clone());
                }
            }
        }

        let failed_count = failures.len();
        let converted_count = entities.len() - failed_count;
        let mut message = format!(
            "Converted {converted_count} of {} items from {from} to {to}",
            entities.len()
        );
        if failed_count > 0 {
            message.push_str(&format!(", {failed_count} failed"));
        }
        info!(converted_count, failed_count, rate, "{}", message);

        ConversionOutcome {
            converted_entities,
            converted_count,
            failed_count,
            success: failed_count == 0,
            message,
            rate,
            failures,
        }
    }
}

fn read_amounts<E: Convertible>(
    entity: &E,
    fields: &[&str],
) -> Result<BTreeMap<String, f64>, FieldError> {
    if fields.is_empty() {
        return Err(FieldError::NoFields);
    }
    fields
        .iter()
        .map(|field| entity.amount(field).map(|amount| (field.to_string(), amount)))
        .collect()
}

/// Converts every field of a copy of `entity`, or none of them.
fn convert_entity<E: Convertible>(
    entity: &E,
    fields: &[&str],
    rate: f64,
    to: &str,
) -> Result<(E, BTreeMap<String, f64>), FieldError> {
    let original_amounts = read_amounts(entity, fields)?;
    let mut converted = entity.clone();
    for (field, amount) in &original_amounts {
        let value = currency::round(amount * rate, to);
        if !value.is_finite() {
            return Err(FieldError::OutOfRange(field.clone()));
        }
        converted.set_amount(field, value)?;
    }
    Ok((converted, original_amounts))
}
