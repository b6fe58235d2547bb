//! Currency registry and rounding policy

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Precision used for codes missing from the registry.
pub const DEFAULT_DECIMAL_DIGITS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimal_digits: u32,
}

const fn currency(
    code: &'static str,
    symbol: &'static str,
    name: &'static str,
    decimal_digits: u32,
) -> Currency {
    Currency {
        code,
        symbol,
        name,
        decimal_digits,
    }
}

static CURRENCIES: &[Currency] = &[
    currency("USD", "$", "US Dollar", 2),
    currency("EUR", "€", "Euro", 2),
    currency("GBP", "£", "British Pound", 2),
    currency("KES", "KSh", "Kenyan Shilling", 2),
    currency("UGX", "USh", "Ugandan Shilling", 0),
    currency("TZS", "TSh", "Tanzanian Shilling", 2),
    currency("RWF", "FRw", "Rwandan Franc", 0),
    currency("NGN", "₦", "Nigerian Naira", 2),
    currency("ZAR", "R", "South African Rand", 2),
    currency("GHS", "GH₵", "Ghanaian Cedi", 2),
    currency("ETB", "Br", "Ethiopian Birr", 2),
    currency("INR", "₹", "Indian Rupee", 2),
    currency("JPY", "¥", "Japanese Yen", 0),
    currency("CNY", "CN¥", "Chinese Yuan", 2),
    currency("AED", "AED", "UAE Dirham", 2),
];

/// All supported currencies, in display order.
pub fn all() -> &'static [Currency] {
    CURRENCIES
}

/// Finds a currency by code, ignoring case and surrounding whitespace.
pub fn lookup(code: &str) -> Option<&'static Currency> {
    let code = code.trim();
    CURRENCIES
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(code))
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub fn decimal_digits(code: &str) -> u32 {
    lookup(code).map_or(DEFAULT_DECIMAL_DIGITS, |c| c.decimal_digits)
}

/// Rounds `amount` to the precision of `code`, ties away from zero.
pub fn round(amount: f64, code: &str) -> f64 {
    if !amount.is_finite() {
        return amount;
    }
    let digits = decimal_digits(code);

    Decimal::from_f64(amount)
        .map(|d| d.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| {
            // Outside the decimal range; scale in binary instead
            let factor = 10f64.powi(digits as i32);
            let scaled = amount * factor;
            if scaled.is_finite() {
                scaled.round() / factor
            } else {
                amount
            }
        })
}

/// Renders an amount with the currency symbol at the currency's precision.
pub fn format_amount(amount: f64, code: &str) -> String {
    let digits = decimal_digits(code) as usize;
    let rounded = round(amount, code);
    match lookup(code) {
        Some(c) => format!("{} {rounded:.digits$}", c.symbol),
        None => format!("{} {rounded:.digits$}", normalize_code(code)),
    }
}
