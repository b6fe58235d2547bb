//! Projection of priced records onto the fields the converter works with

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a monetary field could not be read from a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing monetary field '{0}'")]
    Missing(String),
    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: String, value: String },
    #[error("field '{0}' is not a finite amount")]
    NotFinite(String),
    #[error("converted value of field '{0}' is out of range")]
    OutOfRange(String),
    #[error("no monetary fields selected")]
    NoFields,
}

/// Provenance attached to every converted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStamp {
    pub original_amounts: BTreeMap<String, f64>,
    pub original_currency: String,
    pub currency: String,
    pub rate: f64,
    pub converted_at: DateTime<Utc>,
}

/// A record carrying one or more monetary fields.
pub trait Convertible: Clone {
    /// Identifier used when reporting failures.
    fn entity_id(&self) -> String;

    fn amount(&self, field: &str) -> Result<f64, FieldError>;

    /// Writes a converted amount. Fails without touching the record when the
    /// value cannot be represented.
    fn set_amount(&mut self, field: &str, value: f64) -> Result<(), FieldError>;

    fn stamp(&mut self, stamp: &ConversionStamp);
}

/// Key under which JSON records carry their [`ConversionStamp`].
pub const STAMP_FIELD: &str = "conversion";

/// Key holding a JSON record's currency, rewritten on conversion.
pub const CURRENCY_FIELD: &str = "currency";

fn finite(field: &str, value: f64) -> Result<f64, FieldError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FieldError::NotFinite(field.to_string()))
    }
}

impl Convertible for Value {
    fn entity_id(&self) -> String {
        match self.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => "<unknown>".to_string(),
        }
    }

    fn amount(&self, field: &str) -> Result<f64, FieldError> {
        match self.get(field) {
            None | Some(Value::Null) => Err(FieldError::Missing(field.to_string())),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| FieldError::NotFinite(field.to_string()))
                .and_then(|v| finite(field, v)),
            Some(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(v) => finite(field, v),
                Err(_) => Err(FieldError::NotNumeric {
                    field: field.to_string(),
                    value: s.clone(),
                }),
            },
            Some(other) => Err(FieldError::NotNumeric {
                field: field.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn set_amount(&mut self, field: &str, value: f64) -> Result<(), FieldError> {
        let number =
            Number::from_f64(value).ok_or_else(|| FieldError::OutOfRange(field.to_string()))?;
        let map = self
            .as_object_mut()
            .ok_or_else(|| FieldError::Missing(field.to_string()))?;
        map.insert(field.to_string(), Value::Number(number));
        Ok(())
    }

    fn stamp(&mut self, stamp: &ConversionStamp) {
        let Some(map) = self.as_object_mut() else {
            return;
        };
        map.insert(
            CURRENCY_FIELD.to_string(),
            Value::String(stamp.currency.clone()),
        );
        let provenance = serde_json::to_value(stamp).unwrap_or_else(|_| Value::Object(Map::new()));
        map.insert(STAMP_FIELD.to_string(), provenance);
    }
}
